// ============================================================
// Layer 5 — SOC Model Capability
// ============================================================
// The trainer treats a model as an opaque capability:
//
//   forward(features [batch, L, 4]) → output [batch, L]
//   trainable parameters            → the burn Module's params
//   architecture()                  → identity for checkpoint keys
//
// Two small reference architectures make the pipeline runnable:
//
//   DenseSocModel  — per-timestep MLP (4 → h → h → 1)
//   LstmSocModel   — LSTM over the sequence + linear head
//
// Reference: Hochreiter & Schmidhuber (1997) LSTM

use std::{fmt, str::FromStr};

use burn::{
    nn::{
        lstm::{Lstm, LstmConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::data::normalizer::FEATURE_WIDTH;

/// Identity of a model architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Dense,
    Lstm,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Dense => "dense",
            Architecture::Lstm  => "lstm",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" | "mlp" => Ok(Architecture::Dense),
            "lstm"          => Ok(Architecture::Lstm),
            other           => Err(format!("unknown architecture '{other}' (expected dense or lstm)")),
        }
    }
}

/// A sequence model that maps feature sequences to one value per step.
pub trait SocModel<B: Backend>: Module<B> {
    /// features: [batch, L, 4] → [batch, L]
    fn forward(&self, features: Tensor<B, 3>) -> Tensor<B, 2>;

    fn architecture(&self) -> Architecture;
}

// ─── Dense ────────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DenseSocConfig {
    #[config(default = 64)]
    pub hidden: usize,
}

impl DenseSocConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseSocModel<B> {
        DenseSocModel {
            input:  LinearConfig::new(FEATURE_WIDTH, self.hidden).init(device),
            hidden: LinearConfig::new(self.hidden, self.hidden).init(device),
            head:   LinearConfig::new(self.hidden, 1).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct DenseSocModel<B: Backend> {
    pub input:  Linear<B>,
    pub hidden: Linear<B>,
    pub head:   Linear<B>,
}

impl<B: Backend> SocModel<B> for DenseSocModel<B> {
    fn forward(&self, features: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, seq_len, _] = features.dims();
        let x = relu(self.input.forward(features));
        let x = relu(self.hidden.forward(x));
        self.head.forward(x).reshape([batch_size, seq_len])
    }

    fn architecture(&self) -> Architecture {
        Architecture::Dense
    }
}

// ─── LSTM ─────────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LstmSocConfig {
    #[config(default = 64)]
    pub hidden: usize,
}

impl LstmSocConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmSocModel<B> {
        LstmSocModel {
            lstm: LstmConfig::new(FEATURE_WIDTH, self.hidden, true).init(device),
            head: LinearConfig::new(self.hidden, 1).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmSocModel<B: Backend> {
    pub lstm: Lstm<B>,
    pub head: Linear<B>,
}

impl<B: Backend> SocModel<B> for LstmSocModel<B> {
    fn forward(&self, features: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, seq_len, _] = features.dims();
        let (hidden, _state) = self.lstm.forward(features, None); // [batch, L, hidden]
        self.head.forward(hidden).reshape([batch_size, seq_len])
    }

    fn architecture(&self) -> Architecture {
        Architecture::Lstm
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let x = Tensor::<NdArray, 3>::zeros([3, 7, FEATURE_WIDTH], &device);

        let dense: DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);
        assert_eq!(dense.forward(x.clone()).dims(), [3, 7]);

        let lstm: LstmSocModel<NdArray> = LstmSocConfig::new().with_hidden(8).init(&device);
        assert_eq!(lstm.forward(x).dims(), [3, 7]);
    }

    #[test]
    fn test_architecture_parse() {
        assert_eq!("LSTM".parse::<Architecture>(), Ok(Architecture::Lstm));
        assert_eq!("dense".parse::<Architecture>(), Ok(Architecture::Dense));
        assert!("transformer".parse::<Architecture>().is_err());
    }
}

use burn::data::dataset::Dataset;

use crate::data::assembler::SocExample;

/// In-memory set of aligned triples, readable by Burn's DataLoader.
#[derive(Debug, Clone, Default)]
pub struct SocDataset {
    examples: Vec<SocExample>,
}

impl SocDataset {
    pub fn new(examples: Vec<SocExample>) -> Self { Self { examples } }

    pub fn examples(&self) -> &[SocExample] { &self.examples }

    pub fn sample_count(&self) -> usize { self.examples.len() }
}

impl Dataset<SocExample> for SocDataset {
    fn get(&self, index: usize) -> Option<SocExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

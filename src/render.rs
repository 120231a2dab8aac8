//! Human-readable and JSON views of an allocator's block list

use crate::core::block::{Block, Owner};
use crate::core::engine::Allocator;
use crate::core::error::Result;
use std::fmt;

/// Titled block-by-block listing of an allocator
pub struct LayoutView<'a> {
    title: &'a str,
    allocator: &'a Allocator,
}

impl<'a> LayoutView<'a> {
    pub fn new(title: &'a str, allocator: &'a Allocator) -> Self {
        LayoutView { title, allocator }
    }
}

impl fmt::Display for LayoutView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = format!("{} Memory Layout:", self.title);
        writeln!(f, "{}", heading)?;
        writeln!(f, "{}", "=".repeat(heading.len()))?;

        for (i, block) in self.allocator.blocks().enumerate() {
            writeln!(f, "Block {}: {}", i, describe(block))?;
        }
        Ok(())
    }
}

fn describe(block: &Block) -> String {
    match block.owner {
        Owner::Free => format!(
            "FREE  - Address: {}, Size: {} units",
            block.start, block.size
        ),
        Owner::Process(pid) => format!(
            "PROC {} - Address: {}, Size: {} units",
            pid, block.start, block.size
        ),
    }
}

/// Block list as a JSON array of `{start, size, owner}`
pub fn layout_json(allocator: &Allocator) -> Result<String> {
    let blocks: Vec<&Block> = allocator.blocks().collect();
    Ok(serde_json::to_string_pretty(&blocks)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::ProcessId;

    #[test]
    fn test_layout_text() {
        let mut alloc = Allocator::first_fit();
        alloc.allocate(ProcessId(1), 5).unwrap();

        let text = LayoutView::new("First Fit", &alloc).to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "First Fit Memory Layout:");
        assert_eq!(lines[1].len(), lines[0].len());
        assert_eq!(lines[2], "Block 0: PROC 1 - Address: 0, Size: 5 units");
        assert_eq!(lines[3], "Block 1: FREE  - Address: 5, Size: 123 units");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_layout_json() {
        let mut alloc = Allocator::best_fit();
        alloc.allocate(ProcessId(7), 4).unwrap();

        let json = layout_json(&alloc).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let blocks = value.as_array().unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["start"], 0);
        assert_eq!(blocks[0]["size"], 4);
        assert_eq!(blocks[0]["owner"]["process"], 7);
        assert_eq!(blocks[1]["owner"], "free");
    }
}

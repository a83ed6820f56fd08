use anyhow::Context;
use std::fs;
use std::path::Path;

/// One test vector: the argv to run the debugee with (argv[0] included)
/// and the expected first line of its captured output.
#[derive(Debug, Clone, PartialEq)]
pub struct TestVector {
    pub argv: Vec<String>,
    pub expected: String,
}

impl TestVector {
    /// Load a vectors file: argv lines alternating with expected-output
    /// lines. A trailing argv line without an expected line gets an empty
    /// expectation.
    pub fn load(path: &Path) -> anyhow::Result<Vec<TestVector>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("open vectors file {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    fn parse(content: &str) -> Vec<TestVector> {
        let mut vectors = vec![];
        let mut lines = content.lines();
        while let Some(argv_line) = lines.next() {
            let argv: Vec<String> = argv_line
                .split(' ')
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect();
            if argv.is_empty() {
                continue;
            }
            let expected = lines.next().unwrap_or_default().to_string();
            vectors.push(TestVector { argv, expected });
        }
        vectors
    }
}

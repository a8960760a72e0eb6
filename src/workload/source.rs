//! Abstract workload source

use std::path::PathBuf;

use crate::utils::Result;

/// Anything that can hand the pipeline a list of work items
///
/// Implementations return at most `count` paths, in a stable order, and
/// report an empty result as `BenchError::EmptyWorkload`.
pub trait WorkloadSource: Send + Sync {
    fn resolve(&self, count: u64) -> Result<Vec<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BenchError;

    /// Fixed in-memory list for testing
    struct ListSource {
        paths: Vec<PathBuf>,
    }

    impl WorkloadSource for ListSource {
        fn resolve(&self, count: u64) -> Result<Vec<PathBuf>> {
            if self.paths.is_empty() {
                return Err(BenchError::EmptyWorkload {
                    dir: PathBuf::from("memory"),
                });
            }
            Ok(self.paths.iter().take(count as usize).cloned().collect())
        }
    }

    #[test]
    fn test_trait_object_resolve() {
        let source: Box<dyn WorkloadSource> = Box::new(ListSource {
            paths: vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")],
        });
        assert_eq!(source.resolve(2).unwrap().len(), 2);
        assert_eq!(source.resolve(10).unwrap().len(), 3);

        let empty = ListSource { paths: Vec::new() };
        assert!(empty.resolve(1).unwrap_err().is_empty_workload());
    }
}

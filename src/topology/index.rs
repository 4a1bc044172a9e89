//! Lookup tables over the functions known to a discovery run.

use super::arn::unqualified_function_arn;
use crate::core::FunctionDescriptor;
use std::collections::HashMap;

/// Known-function index, built once per run and shared by resolution.
#[derive(Debug, Clone, Default)]
pub struct FunctionIndex {
    by_arn: HashMap<String, String>,
    by_normalized_arn: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl FunctionIndex {
    pub fn build(functions: &[FunctionDescriptor]) -> Self {
        let mut index = Self::default();
        for function in functions {
            let arn = function.function_arn.clone();
            index.by_arn.entry(arn.clone()).or_insert_with(|| arn.clone());
            index
                .by_normalized_arn
                .entry(unqualified_function_arn(&arn))
                .or_insert_with(|| arn.clone());
            index
                .by_name
                .entry(function.function_name.clone())
                .or_insert(arn);
        }
        index
    }

    /// Resolve an identifier exactly, then with its qualifier stripped.
    pub fn resolve_arn(&self, arn: &str) -> Option<&str> {
        self.by_arn
            .get(arn)
            .or_else(|| self.by_normalized_arn.get(&unqualified_function_arn(arn)))
            .map(String::as_str)
    }

    /// Resolve a bare name exactly, then with a trailing `:qualifier` removed.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .or_else(|| {
                name.rsplit_once(':')
                    .and_then(|(base, _)| self.by_name.get(base))
            })
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_arn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_arn.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FunctionIndex {
        FunctionIndex::build(&[
            FunctionDescriptor::new("orders", "arn:aws:lambda:us-east-1:1:function:orders"),
            FunctionDescriptor::new("billing", "arn:aws:lambda:us-east-1:1:function:billing"),
        ])
    }

    #[test]
    fn test_resolve_arn_exact_and_qualified() {
        let index = index();
        assert_eq!(
            index.resolve_arn("arn:aws:lambda:us-east-1:1:function:orders"),
            Some("arn:aws:lambda:us-east-1:1:function:orders")
        );
        assert_eq!(
            index.resolve_arn("arn:aws:lambda:us-east-1:1:function:orders:live"),
            Some("arn:aws:lambda:us-east-1:1:function:orders")
        );
        assert_eq!(
            index.resolve_arn("arn:aws:lambda:us-east-1:1:function:missing"),
            None
        );
    }

    #[test]
    fn test_resolve_name_strips_qualifier() {
        let index = index();
        assert_eq!(
            index.resolve_name("billing"),
            Some("arn:aws:lambda:us-east-1:1:function:billing")
        );
        assert_eq!(
            index.resolve_name("billing:3"),
            Some("arn:aws:lambda:us-east-1:1:function:billing")
        );
        assert_eq!(index.resolve_name("shipping"), None);
        assert_eq!(index.len(), 2);
    }
}

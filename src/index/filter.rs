//! Filter query micro-language.
//!
//! A filter query is a conjunction of conditions joined by ` && `:
//!
//! ```text
//! category:shoes
//! price:>=10 && price:<100
//! brand:[nike,adidas]
//! ```
//!
//! String fields support equality and set membership; numeric fields
//! additionally support the comparison operators.

use crate::error::NacreError;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

/// One parsed filter condition
#[derive(Clone, Debug, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub values: Vec<String>,
}

/// Parse a filter query into its conditions. An empty query matches
/// everything and parses to no conditions.
pub fn parse_filter_query(filter_query: &str) -> Result<Vec<FilterCondition>> {
    let filter_query = filter_query.trim();
    if filter_query.is_empty() {
        return Ok(Vec::new());
    }

    filter_query.split("&&").map(parse_condition).collect()
}

fn parse_condition(raw: &str) -> Result<FilterCondition> {
    let malformed = || NacreError::BadRequest(format!("Filter condition `{}` is malformed.", raw.trim()));

    let (field, rhs) = raw.trim().split_once(':').ok_or_else(malformed)?;
    let field = field.trim();
    let rhs = rhs.trim();

    if field.is_empty() || rhs.is_empty() {
        return Err(malformed());
    }

    let (op, values) = if let Some(rest) = rhs.strip_prefix(">=") {
        (FilterOp::Gte, vec![rest.trim().to_string()])
    } else if let Some(rest) = rhs.strip_prefix("<=") {
        (FilterOp::Lte, vec![rest.trim().to_string()])
    } else if let Some(rest) = rhs.strip_prefix('>') {
        (FilterOp::Gt, vec![rest.trim().to_string()])
    } else if let Some(rest) = rhs.strip_prefix('<') {
        (FilterOp::Lt, vec![rest.trim().to_string()])
    } else if let Some(rest) = rhs.strip_prefix('[') {
        let inner = rest.strip_suffix(']').ok_or_else(malformed)?;
        let values: Vec<String> = inner
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(malformed());
        }
        (FilterOp::In, values)
    } else {
        (FilterOp::Eq, vec![rhs.to_string()])
    };

    if values.iter().any(|v| v.is_empty()) {
        return Err(malformed());
    }

    Ok(FilterCondition {
        field: field.to_string(),
        op,
        values,
    })
}

impl FilterCondition {
    pub fn matches_strings(&self, doc_values: &[String]) -> bool {
        match self.op {
            FilterOp::Eq | FilterOp::In => self
                .values
                .iter()
                .any(|v| doc_values.iter().any(|dv| dv == v)),
            // Comparison operators are numeric-only
            _ => false,
        }
    }

    pub fn matches_ints(&self, doc_values: &[i64]) -> bool {
        let Some(target) = self.values.first().and_then(|v| v.parse::<i64>().ok()) else {
            return match self.op {
                FilterOp::Eq | FilterOp::In => self.any_int_in_set(doc_values),
                _ => false,
            };
        };

        match self.op {
            FilterOp::Eq => doc_values.contains(&target),
            FilterOp::In => self.any_int_in_set(doc_values),
            FilterOp::Gt => doc_values.iter().any(|&v| v > target),
            FilterOp::Gte => doc_values.iter().any(|&v| v >= target),
            FilterOp::Lt => doc_values.iter().any(|&v| v < target),
            FilterOp::Lte => doc_values.iter().any(|&v| v <= target),
        }
    }

    fn any_int_in_set(&self, doc_values: &[i64]) -> bool {
        self.values
            .iter()
            .filter_map(|v| v.parse::<i64>().ok())
            .any(|v| doc_values.contains(&v))
    }

    pub fn matches_floats(&self, doc_values: &[f64]) -> bool {
        let targets: Vec<f64> = self
            .values
            .iter()
            .filter_map(|v| v.parse::<f64>().ok())
            .collect();
        let Some(&target) = targets.first() else {
            return false;
        };

        match self.op {
            FilterOp::Eq | FilterOp::In => targets
                .iter()
                .any(|t| doc_values.iter().any(|v| v == t)),
            FilterOp::Gt => doc_values.iter().any(|&v| v > target),
            FilterOp::Gte => doc_values.iter().any(|&v| v >= target),
            FilterOp::Lt => doc_values.iter().any(|&v| v < target),
            FilterOp::Lte => doc_values.iter().any(|&v| v <= target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_match_all() {
        assert!(parse_filter_query("").unwrap().is_empty());
        assert!(parse_filter_query("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_equality() {
        let conds = parse_filter_query("category:shoes").unwrap();
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].field, "category");
        assert_eq!(conds[0].op, FilterOp::Eq);
        assert_eq!(conds[0].values, vec!["shoes"]);
    }

    #[test]
    fn test_parse_conjunction_with_comparisons() {
        let conds = parse_filter_query("price:>=10 && price:<100").unwrap();
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].op, FilterOp::Gte);
        assert_eq!(conds[1].op, FilterOp::Lt);
        assert_eq!(conds[1].values, vec!["100"]);
    }

    #[test]
    fn test_parse_in_list() {
        let conds = parse_filter_query("brand:[nike, adidas]").unwrap();
        assert_eq!(conds[0].op, FilterOp::In);
        assert_eq!(conds[0].values, vec!["nike", "adidas"]);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_filter_query("no-colon").is_err());
        assert!(parse_filter_query("field:").is_err());
        assert!(parse_filter_query("brand:[").is_err());
        assert!(parse_filter_query("brand:[]").is_err());
    }

    #[test]
    fn test_int_comparisons() {
        let cond = parse_filter_query("year:>2000").unwrap().remove(0);
        assert!(cond.matches_ints(&[2001]));
        assert!(!cond.matches_ints(&[2000]));
        assert!(!cond.matches_ints(&[]));
    }

    #[test]
    fn test_string_membership() {
        let cond = parse_filter_query("tags:[red,blue]").unwrap().remove(0);
        assert!(cond.matches_strings(&["blue".to_string()]));
        assert!(!cond.matches_strings(&["green".to_string()]));
        // Comparisons never match string values
        let cond = parse_filter_query("tags:>a").unwrap().remove(0);
        assert!(!cond.matches_strings(&["b".to_string()]));
    }

    #[test]
    fn test_float_comparisons() {
        let cond = parse_filter_query("price:<=9.5").unwrap().remove(0);
        assert!(cond.matches_floats(&[9.5]));
        assert!(!cond.matches_floats(&[10.0]));
    }
}

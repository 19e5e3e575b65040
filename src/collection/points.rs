//! Token-ranking score encoding.
//!
//! The optional token-ranking field collapses to a single signed 32-bit
//! `points` value whose plain integer order equals the desired ranking
//! order. The shard engine sorts candidates by `points` as an integer, so
//! the float transform here is a wire-level contract, not an optimization.

use serde_json::Value;

/// Derive the ranking points for a validated document.
///
/// Returns 0 when the collection has no token-ranking field. Integer
/// values are used as-is (the validator has already bounded them to i32);
/// floats go through the order-preserving bit transform.
pub fn ranking_points(document: &Value, token_ranking_field: &str) -> i32 {
    if token_ranking_field.is_empty() {
        return 0;
    }

    match document.get(token_ranking_field) {
        Some(value) if value.is_f64() => encode_float(value.as_f64().unwrap_or(0.0) as f32),
        Some(value) => value.as_i64().unwrap_or(0) as i32,
        None => 0,
    }
}

/// Order-preserving f32 → i32 transform.
///
/// Flips the bit pattern so that the signed integer order of the result
/// matches the numeric order of the input, including negatives, then
/// shifts the range down from `i32::MAX`.
pub fn encode_float(value: f32) -> i32 {
    let bits = value.to_bits() as i32;
    let mask = (bits >> 31) | i32::MIN;
    let bits = bits ^ mask;
    i32::MAX.wrapping_sub(bits).wrapping_neg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_ranking_field_yields_zero() {
        let doc = json!({"title": "x", "score": 5});
        assert_eq!(ranking_points(&doc, ""), 0);
    }

    #[test]
    fn test_integer_points_pass_through() {
        let doc = json!({"score": 42});
        assert_eq!(ranking_points(&doc, "score"), 42);
        let doc = json!({"score": -7});
        assert_eq!(ranking_points(&doc, "score"), -7);
    }

    #[test]
    fn test_float_encoding_preserves_order() {
        let floats = [
            f32::MIN,
            -1234.5,
            -1.0,
            -0.25,
            -0.0,
            0.0,
            0.25,
            1.0,
            9.5,
            10.0,
            1234.5,
            f32::MAX,
        ];
        let encoded: Vec<i32> = floats.iter().map(|&f| encode_float(f)).collect();

        for window in encoded.windows(2) {
            assert!(window[0] <= window[1], "encoding must be monotone");
        }
        // Strictly increasing for strictly increasing inputs
        assert!(encode_float(9.5) < encode_float(10.0));
        assert!(encode_float(-1.0) < encode_float(1.0));
    }

    #[test]
    fn test_float_points_via_document() {
        let lo = ranking_points(&json!({"score": 1.5}), "score");
        let hi = ranking_points(&json!({"score": 2.5}), "score");
        assert!(lo < hi);
    }
}

//! @ai:module:intent Payload survival metrics comparing embedded and extracted text
//! @ai:module:layer domain
//! @ai:module:public_api payload_bits, calculate_ber, calculate_ncc_text
//! @ai:module:stateless true

use std::collections::{HashMap, HashSet};

/// Sequences at least this long get popular elements pruned before matching.
const AUTOJUNK_MIN_LEN: usize = 200;

/// @ai:intent Expand a payload into its bit string
/// @ai:post a string made only of '0'/'1' is taken as bits already
/// @ai:effects pure
pub fn payload_bits(payload: &str) -> Vec<u8> {
    if payload.chars().all(|c| c == '0' || c == '1') {
        return payload.bytes().map(|b| b - b'0').collect();
    }

    payload
        .chars()
        .flat_map(|c| {
            format!("{:08b}", c as u32)
                .into_bytes()
                .into_iter()
                .map(|b| b - b'0')
        })
        .collect()
}

/// @ai:intent Fraction of mismatched bits after zero-padding the shorter bit string
/// @ai:post result in [0, 1]; 0.0 when both payloads are empty
/// @ai:example ("AB", "AB") -> 0.0
/// @ai:example ("AB", "AC") -> 0.0625
/// @ai:effects pure
pub fn calculate_ber(original: &str, extracted: &str) -> f64 {
    let orig = payload_bits(original);
    let ext = payload_bits(extracted);

    let max_len = orig.len().max(ext.len());
    if max_len == 0 {
        return 0.0;
    }

    let errors = (0..max_len)
        .filter(|&i| orig.get(i).copied().unwrap_or(0) != ext.get(i).copied().unwrap_or(0))
        .count();

    errors as f64 / max_len as f64
}

/// @ai:intent Similarity ratio 2*M/T of two strings, M being the matched characters
/// @ai:post result in [0, 1]; 1.0 when both strings are empty
/// @ai:effects pure
pub fn calculate_ncc_text(original: &str, extracted: &str) -> f64 {
    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = extracted.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matcher = SequenceMatcher::new(&a, &b);
    2.0 * matcher.matched_len() as f64 / total as f64
}

/// Ratcliff/Obershelp longest-block matcher over char sequences.
struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        // Popular elements (more than 1% of b) are dropped from the index.
        if b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            let popular: HashSet<char> = b2j
                .iter()
                .filter(|(_, idxs)| idxs.len() > ntest)
                .map(|(c, _)| *c)
                .collect();
            for c in popular {
                b2j.remove(&c);
            }
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in a[alo..ahi] x b[blo..bhi], earliest on ties.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Extend through elements pruned from the index.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    fn matched_len(&self) -> usize {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ber_identical_payloads() {
        assert_eq!(calculate_ber("AB", "AB"), 0.0);
    }

    #[test]
    fn test_ber_single_bit_difference() {
        // 'B' = 01000010, 'C' = 01000011
        assert_eq!(calculate_ber("AB", "AC"), 1.0 / 16.0);
    }

    #[test]
    fn test_ber_empty_extraction_pads_with_zeros() {
        // 'A' = 01000001 has two set bits
        assert_eq!(calculate_ber("A", ""), 2.0 / 8.0);
        assert_eq!(calculate_ber("", ""), 0.0);
    }

    #[test]
    fn test_ber_binary_strings_taken_verbatim() {
        assert_eq!(calculate_ber("1010", "1000"), 0.25);
    }

    #[test]
    fn test_ncc_text_bounds() {
        assert_eq!(calculate_ncc_text("hello", "hello"), 1.0);
        assert_eq!(calculate_ncc_text("abc", "xyz"), 0.0);
        assert_eq!(calculate_ncc_text("", ""), 1.0);
        assert_eq!(calculate_ncc_text("abc", ""), 0.0);
    }

    #[test]
    fn test_ncc_text_partial_match() {
        // "abcd" vs "bcde": matched block "bcd" -> 2*3/8
        assert!((calculate_ncc_text("abcd", "bcde") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_ncc_text_long_identical_strings() {
        let text: String = "ab".repeat(150);
        assert_eq!(calculate_ncc_text(&text, &text), 1.0);
    }
}

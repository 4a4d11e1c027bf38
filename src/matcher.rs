//! Test name matching.
//!
//! Two independent mechanisms select tests by name:
//! * [`wildcard_match`] backs `--filter=PATTERN`, where `*` matches any run
//!   of characters and the pattern must cover the whole name.
//! * [`lookup`] backs the positional test names: an exact name wins, then a
//!   whole-word match, then any substring.

/// Characters that separate words inside a test name.
const WORD_DELIMITERS: &[u8] = b" \t-_/.,:;";

/// Returns whether `name` is selected by the wildcard `pattern`.
///
/// An empty pattern selects everything.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
	if pattern.is_empty() {
		return true;
	}

	let pattern = pattern.as_bytes();
	let name = name.as_bytes();
	let mut p = 0;
	let mut n = 0;
	// Position of the last `*` seen, and the name position it is currently
	// assumed to stretch up to.
	let mut backtrack: Option<(usize, usize)> = None;

	while n < name.len() {
		match pattern.get(p) {
			Some(b'*') => {
				backtrack = Some((p, n));
				p += 1;
			}
			Some(&c) if c == name[n] => {
				p += 1;
				n += 1;
			}
			_ => match backtrack {
				Some((star, stretch)) => {
					// Let the wildcard swallow one more character and retry.
					backtrack = Some((star, stretch + 1));
					p = star + 1;
					n = stretch + 1;
				}
				None => return false,
			},
		}
	}

	pattern[p..].iter().all(|&c| c == b'*')
}

/// Returns whether `name` contains `word` bounded on both sides by the start
/// or end of the name or by a delimiter.
pub fn contains_word(name: &str, word: &str) -> bool {
	if word.is_empty() {
		return false;
	}

	let bytes = name.as_bytes();
	let is_boundary = |c: Option<&u8>| c.map_or(true, |c| WORD_DELIMITERS.contains(c));

	// Occurrences may overlap, so resume one character after each start.
	let mut from = 0;
	while let Some(offset) = name[from..].find(word) {
		let start = from + offset;
		let end = start + word.len();
		let before = start.checked_sub(1).and_then(|i| bytes.get(i));
		if is_boundary(before) && is_boundary(bytes.get(end)) {
			return true;
		}
		from = start + name[start..].chars().next().map_or(1, char::len_utf8);
	}
	false
}

/// Finds the indices of `names` selected by a positional test name.
///
/// Three passes are tried in order and the first one with any hit wins:
/// exact equality (first hit only), word containment, then plain substring
/// containment.
pub fn lookup<'a, I>(names: I, pattern: &str) -> Vec<usize>
where
	I: IntoIterator<Item = &'a str>,
	I::IntoIter: Clone,
{
	let names = names.into_iter();

	if let Some(index) = names.clone().position(|name| name == pattern) {
		return vec![index];
	}

	let words: Vec<usize> = names
		.clone()
		.enumerate()
		.filter(|(_, name)| contains_word(name, pattern))
		.map(|(i, _)| i)
		.collect();
	if !words.is_empty() {
		return words;
	}

	names
		.enumerate()
		.filter(|(_, name)| name.contains(pattern))
		.map(|(i, _)| i)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_pattern_matches_everything() {
		for name in ["", "a", "suite.case", "*"] {
			assert!(wildcard_match("", name));
		}
	}

	#[test]
	fn literal_patterns_match_themselves_only() {
		for name in ["a", "suite.case", "suite.case/3", "with space"] {
			assert!(wildcard_match(name, name));
		}
		assert!(!wildcard_match("suite.case", "suite.cas"));
		assert!(!wildcard_match("suite.cas", "suite.case"));
		assert!(!wildcard_match("abc", ""));
	}

	#[test]
	fn star_matches_everything() {
		for name in ["", "a", "suite.case", "***"] {
			assert!(wildcard_match("*", name));
			assert!(wildcard_match("**", name));
		}
	}

	#[test]
	fn wildcard_boundaries() {
		assert!(wildcard_match("foo*", "foobar"));
		assert!(!wildcard_match("foo*", "barfoo"));
		assert!(wildcard_match("*foo*", "xxfooyy"));
		assert!(wildcard_match("*foo", "barfoo"));
		assert!(!wildcard_match("*foo", "foobar"));
		assert!(wildcard_match("foo*", "foo"));
		assert!(wildcard_match("*foo", "foo"));
	}

	#[test]
	fn multiple_wildcards() {
		assert!(wildcard_match("*foo*bar", "xfooybar"));
		assert!(wildcard_match("*foo*bar", "foobar"));
		assert!(!wildcard_match("*foo*bar", "xfooybarz"));
		assert!(wildcard_match("Suite1*.a", "Suite1Case.a"));
		assert!(!wildcard_match("Suite1*.a", "Suite1Case.b"));
		assert!(wildcard_match("a*b*c", "abbbc"));
	}

	#[test]
	fn backtracking_retries_partial_matches() {
		// The first `a` after the star is a false start.
		assert!(wildcard_match("*ab", "aab"));
		assert!(wildcard_match("*aab", "aaab"));
		assert!(wildcard_match("*.case", "suite.a.case"));
		assert!(!wildcard_match("*ab", "aba"));
	}

	#[test]
	fn non_ascii_names() {
		assert!(wildcard_match("tëst.*", "tëst.ü"));
		assert!(wildcard_match("*ü", "tëst.ü"));
		assert!(!wildcard_match("*ü", "tëst.u"));
	}

	#[test]
	fn word_containment() {
		assert!(contains_word("suite.case", "suite"));
		assert!(contains_word("suite.case", "case"));
		assert!(contains_word("a-b_c d", "b"));
		assert!(!contains_word("suite.cases", "case"));
		assert!(!contains_word("testsuite.a", "suite"));
		// A later occurrence may still be a whole word.
		assert!(contains_word("cases.case", "case"));
		// Only the second, overlapping occurrence is bounded.
		assert!(contains_word("xa.a.a", "a.a"));
		assert!(contains_word("xë.ë.ë", "ë.ë"));
		assert!(!contains_word("xa.a.ax", "a.a"));
		assert!(!contains_word("anything", ""));
	}

	const NAMES: [&str; 5] = ["math.add", "math.addition", "io.read", "io.readall", "math"];

	#[test]
	fn lookup_prefers_exact_match() {
		assert_eq!(lookup(NAMES, "math"), vec![4]);
		assert_eq!(lookup(NAMES, "io.read"), vec![2]);
	}

	#[test]
	fn lookup_falls_back_to_words() {
		assert_eq!(lookup(NAMES, "add"), vec![0]);
		assert_eq!(lookup(NAMES, "io"), vec![2, 3]);
	}

	#[test]
	fn lookup_falls_back_to_substrings() {
		assert_eq!(lookup(NAMES, "dit"), vec![1]);
		assert_eq!(lookup(NAMES, "ead"), vec![2, 3]);
		assert!(lookup(NAMES, "missing").is_empty());
	}
}

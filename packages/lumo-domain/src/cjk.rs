/// CJK unified ideographs as matched by the query character filter.
pub fn is_cjk_ideograph(ch: char) -> bool {
	matches!(ch, '\u{4E00}'..='\u{9FA5}')
}

/// Returns the character when `input` is exactly one CJK ideograph.
pub fn single_ideograph(input: &str) -> Option<char> {
	let mut chars = input.chars();
	let first = chars.next()?;

	if chars.next().is_some() || !is_cjk_ideograph(first) {
		return None;
	}

	Some(first)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_ideographs_only_inside_the_unified_block() {
		assert!(is_cjk_ideograph('海'));
		assert!(!is_cjk_ideograph('s'));
		assert!(!is_cjk_ideograph('カ'));
	}

	#[test]
	fn single_ideograph_requires_exactly_one_char() {
		assert_eq!(single_ideograph("猫"), Some('猫'));
		assert_eq!(single_ideograph("猫咪"), None);
		assert_eq!(single_ideograph("a"), None);
		assert_eq!(single_ideograph(""), None);
	}
}

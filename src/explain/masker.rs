//! Turns token coalitions back into text.
//!
//! A coalition is a boolean mask over the input's model tokens (`true` keeps
//! the token). The masked text reuses the original characters between
//! tokens, so a fully kept mask reproduces the input exactly; masked tokens
//! become the tokenizer's mask token.

use crate::model::TokenSpan;

#[derive(Debug, Clone)]
pub struct TextMasker {
    mask_token: String,
    collapse: bool,
}

impl TextMasker {
    /// `collapse` replaces each run of masked tokens with one mask token.
    pub fn new(mask_token: impl Into<String>, collapse: bool) -> Self {
        Self {
            mask_token: mask_token.into(),
            collapse,
        }
    }

    pub fn apply(&self, text: &str, tokens: &[TokenSpan], keep: &[bool]) -> String {
        debug_assert_eq!(tokens.len(), keep.len());
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut in_masked_run = false;

        for (token, &kept) in tokens.iter().zip(keep) {
            if kept {
                out.push_str(&text[cursor..token.end]);
                in_masked_run = false;
            } else {
                if !(self.collapse && in_masked_run) {
                    out.push_str(&text[cursor..token.start]);
                    out.push_str(&self.mask_token);
                }
                in_masked_run = true;
            }
            cursor = token.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tokenize;
    use crate::testing::LexiconBackend;

    fn spans(text: &str) -> Vec<TokenSpan> {
        LexiconBackend::new().tokenize(text).unwrap()
    }

    #[test]
    fn test_all_kept_is_identity() {
        let text = "  I love this product!  ";
        let tokens = spans(text);
        let masker = TextMasker::new("[MASK]", true);
        assert_eq!(masker.apply(text, &tokens, &vec![true; tokens.len()]), text);
    }

    #[test]
    fn test_masking_single_token() {
        let text = "I love this product!";
        let tokens = spans(text);
        let masker = TextMasker::new("[MASK]", true);
        let keep = [true, false, true, true, true];
        assert_eq!(masker.apply(text, &tokens, &keep), "I [MASK] this product!");
    }

    #[test]
    fn test_collapse_runs() {
        let text = "I love this product!";
        let tokens = spans(text);
        let keep = [true, false, false, false, true];

        let collapsed = TextMasker::new("[MASK]", true).apply(text, &tokens, &keep);
        assert_eq!(collapsed, "I [MASK]!");

        let expanded = TextMasker::new("[MASK]", false).apply(text, &tokens, &keep);
        assert_eq!(expanded, "I [MASK] [MASK] [MASK]!");
    }

    #[test]
    fn test_all_masked() {
        let text = "This is terrible.";
        let tokens = spans(text);
        let masker = TextMasker::new("[MASK]", true);
        assert_eq!(masker.apply(text, &tokens, &vec![false; tokens.len()]), "[MASK]");
    }
}

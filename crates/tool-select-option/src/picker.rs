//! Deciding which option a preference refers to. Pure; no page access.

use crate::model::{Choice, MatchKind, OptionEntry, PreferenceSet, SelectionPreference};
use crate::normalize::{contains_normalized, normalize};
use crate::policy::DEFAULT_PLACEHOLDER_PHRASES;

/// Picks an option using the default placeholder phrases.
///
/// Preferences are tried keyword, count, index; the first that yields an
/// option wins. `None` means nothing matched.
pub fn choose(
    options: &[OptionEntry],
    preferences: &PreferenceSet,
    skip_leading_placeholder: bool,
) -> Option<Choice> {
    choose_with_phrases(
        options,
        preferences,
        skip_leading_placeholder,
        DEFAULT_PLACEHOLDER_PHRASES,
    )
}

pub fn choose_with_phrases<S: AsRef<str>>(
    options: &[OptionEntry],
    preferences: &PreferenceSet,
    skip_leading_placeholder: bool,
    placeholder_phrases: &[S],
) -> Option<Choice> {
    preferences.ordered().iter().find_map(|preference| {
        choose_one(
            options,
            preference,
            skip_leading_placeholder,
            placeholder_phrases,
        )
    })
}

/// Applies a single preference.
pub fn choose_one<S: AsRef<str>>(
    options: &[OptionEntry],
    preference: &SelectionPreference,
    skip_leading_placeholder: bool,
    placeholder_phrases: &[S],
) -> Option<Choice> {
    let (position, matched_by) = match preference {
        SelectionPreference::Keyword(keyword) => (
            options
                .iter()
                .position(|option| contains_normalized(&option.label, keyword))?,
            MatchKind::Keyword,
        ),
        SelectionPreference::Count(count) => (
            options
                .iter()
                .position(|option| matches_count(option, *count))?,
            MatchKind::Count,
        ),
        SelectionPreference::Index(index) => {
            let shift = usize::from(
                skip_leading_placeholder
                    && options
                        .first()
                        .map(|first| is_placeholder(first, placeholder_phrases))
                        .unwrap_or(false),
            );
            let position = index.checked_add(shift)?;
            if position >= options.len() {
                return None;
            }
            (position, MatchKind::Index)
        }
    };

    let option = &options[position];
    Some(Choice {
        value: option.value.clone(),
        label: option.label.clone(),
        position,
        matched_by,
    })
}

/// A leading "please choose" entry: empty value or a known phrase.
pub fn is_placeholder<S: AsRef<str>>(option: &OptionEntry, phrases: &[S]) -> bool {
    option.value.trim().is_empty()
        || phrases
            .iter()
            .any(|phrase| contains_normalized(&option.label, phrase.as_ref()))
}

/// "n枚" in the label (not preceded by another digit) or a value ending in "/n".
fn matches_count(option: &OptionEntry, count: u32) -> bool {
    let unit = format!("{count}枚");
    let label = normalize(&option.label);
    let label_hit = label.match_indices(&unit).any(|(at, _)| {
        !label[..at]
            .chars()
            .next_back()
            .map(|prev| prev.is_ascii_digit())
            .unwrap_or(false)
    });
    label_hit || option.value.ends_with(&format!("/{count}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(raw: &[(&str, &str)]) -> Vec<OptionEntry> {
        raw.iter().map(|(l, v)| OptionEntry::new(*l, *v)).collect()
    }

    #[test]
    fn placeholder_shifts_index() {
        let options = entries(&[
            ("選択して下さい", ""),
            ("2025/11/15 18:00", "PERF1"),
            ("2025/11/16 18:00", "PERF2"),
        ]);
        let choice = choose(&options, &PreferenceSet::new().index(0), true).unwrap();
        assert_eq!(choice.value, "PERF1");
        assert_eq!(choice.matched_by, MatchKind::Index);
    }

    #[test]
    fn count_matches_unit_label() {
        let options = entries(&[("S席(1枚)", "A/1"), ("S席(2枚)", "A/2")]);
        let choice = choose(&options, &PreferenceSet::new().count(2), true).unwrap();
        assert_eq!(choice.value, "A/2");
    }

    #[test]
    fn keyword_beats_count() {
        let options = entries(&[("S席(2枚)", "A/2"), ("A席(1枚)", "B/1")]);
        let prefs = PreferenceSet::new().count(2).keyword("Ａ席");
        let choice = choose(&options, &prefs, true).unwrap();
        assert_eq!(choice.value, "B/1");
        assert_eq!(choice.matched_by, MatchKind::Keyword);
    }

    #[test]
    fn count_beats_index() {
        let options = entries(&[("1枚", "1"), ("2枚", "2"), ("3枚", "3")]);
        let prefs = PreferenceSet::new().index(0).count(3);
        assert_eq!(choose(&options, &prefs, false).unwrap().value, "3");
    }

    #[test]
    fn keyword_miss_falls_through_to_index() {
        let options = entries(&[("", ""), ("東京", "T"), ("大阪", "O")]);
        let prefs = PreferenceSet::new().keyword("名古屋").index(1);
        let choice = choose(&options, &prefs, true).unwrap();
        assert_eq!(choice.value, "O");
        assert_eq!(choice.matched_by, MatchKind::Index);
    }

    #[test]
    fn empty_first_value_always_shifts() {
        for index in 0..3 {
            let options = entries(&[("-", ""), ("a", "a"), ("b", "b"), ("c", "c")]);
            let choice = choose(&options, &PreferenceSet::new().index(index), true).unwrap();
            assert_eq!(choice.position, index + 1);
        }
        let lone = entries(&[("-", "")]);
        assert!(choose(&lone, &PreferenceSet::new().index(0), true).is_none());
    }

    #[test]
    fn no_shift_without_flag_or_placeholder() {
        let options = entries(&[("選択して下さい", ""), ("a", "a")]);
        assert_eq!(
            choose(&options, &PreferenceSet::new().index(0), false)
                .unwrap()
                .value,
            ""
        );
        let options = entries(&[("x", "x"), ("y", "y")]);
        assert_eq!(
            choose(&options, &PreferenceSet::new().index(0), true)
                .unwrap()
                .value,
            "x"
        );
    }

    #[test]
    fn out_of_bounds_index_is_none() {
        let options = entries(&[("a", "a")]);
        assert!(choose(&options, &PreferenceSet::new().index(5), true).is_none());
        assert!(choose(&options, &PreferenceSet::new(), true).is_none());
    }

    #[test]
    fn count_ignores_longer_numbers() {
        let options = entries(&[("12枚", "X/12"), ("2枚", "X/2")]);
        assert_eq!(
            choose(&options, &PreferenceSet::new().count(2), false)
                .unwrap()
                .value,
            "X/2"
        );
    }

    #[test]
    fn count_matches_value_suffix_and_fullwidth_label() {
        let options = entries(&[("一般", "G/1"), ("一般", "G/4")]);
        assert_eq!(
            choose(&options, &PreferenceSet::new().count(4), false)
                .unwrap()
                .value,
            "G/4"
        );
        let options = entries(&[("４枚", "x")]);
        assert!(choose(&options, &PreferenceSet::new().count(4), false).is_some());
    }

    #[test]
    fn keyword_normalizes_both_sides() {
        let options = entries(&[("2025/11/15（土）\u{3000}18:00 開演", "P1")]);
        let prefs = PreferenceSet::new().keyword("11/15(土) 18:00");
        assert_eq!(choose(&options, &prefs, true).unwrap().value, "P1");
    }
}

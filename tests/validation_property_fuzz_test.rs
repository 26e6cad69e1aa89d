use chrono::{Datelike, NaiveDate, Weekday};
use parking_form::{FieldKey, FieldValues, Validator, alert_text, calculate_cost, luhn_check};
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn reference_luhn(digits: &str) -> Option<bool> {
    let mut sum = 0u32;
    for (index, c) in digits.chars().enumerate() {
        let digit = c.to_digit(10)?;
        sum += if index % 2 == 0 {
            let doubled = digit * 2;
            doubled / 10 + doubled % 10
        } else {
            digit
        };
    }
    Some(sum % 10 == 0)
}

fn date_strategy() -> BoxedStrategy<NaiveDate> {
    (2020i32..2035, 1u32..=12, 1u32..=28)
        .prop_map(|(year, month, day)| NaiveDate::from_ymd_opt(year, month, day).unwrap())
        .boxed()
}

fn card_messages(raw: &str) -> Vec<&'static str> {
    let mut values = FieldValues::new();
    values.set(FieldKey::CreditCard, raw);
    let validator = Validator::new(fixed_today()).unwrap();
    let report = validator.validate(&values).unwrap();
    report.messages(FieldKey::CreditCard).to_vec()
}

fn assert_cost_matches_calendar_walk(start: NaiveDate, days: u32) -> TestCaseResult {
    let mut expected = 0u32;
    let mut current = start;
    for _ in 0..days {
        expected += if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            7
        } else {
            5
        };
        current = current.succ_opt().unwrap();
    }
    let total = calculate_cost(start, days);
    prop_assert_eq!(total, expected);
    prop_assert!(total >= days * 5 && total <= days * 7);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn luhn_agrees_with_reference_model(digits in "[0-9]{16}") {
        prop_assert_eq!(Some(luhn_check(&digits)), reference_luhn(&digits));
    }

    #[test]
    fn sixteen_digit_cards_validate_iff_luhn_passes(digits in "[0-9]{16}") {
        let expected: Vec<&str> = if luhn_check(&digits) {
            vec![]
        } else {
            vec![alert_text::CARD]
        };
        prop_assert_eq!(card_messages(&digits), expected);
    }

    #[test]
    fn stripped_length_other_than_sixteen_is_invalid(raw in "[0-9 -]{1,25}") {
        prop_assume!(!raw.trim().is_empty());
        let stripped: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        prop_assume!(stripped.len() != 16);
        prop_assert_eq!(card_messages(&raw), vec![alert_text::CARD]);
    }

    #[test]
    fn cost_matches_calendar_walk(start in date_strategy(), days in 0u32..=60) {
        assert_cost_matches_calendar_walk(start, days)?;
    }

    #[test]
    fn cvv_rule_agrees_with_trim_model(raw in "[ \t0-9a-z]{0,8}") {
        let mut values = FieldValues::new();
        values.set(FieldKey::Cvv, raw.as_str());
        let validator = Validator::new(fixed_today()).unwrap();
        let report = validator.validate(&values).unwrap();
        let trimmed = raw.trim();
        let expected: Vec<&str> = if trimmed.is_empty() {
            vec![alert_text::REQUIRED]
        } else if trimmed.len() == 3 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            vec![]
        } else {
            vec![alert_text::CVV_DIGITS]
        };
        prop_assert_eq!(report.messages(FieldKey::Cvv).to_vec(), expected);
    }

    #[test]
    fn validation_is_pure_and_idempotent(
        name in "[A-Za-z@ ]{0,10}",
        year in "[0-9]{0,5}",
        days in "[0-9]{0,3}",
        cvv in "[0-9]{0,5}",
    ) {
        let mut values = FieldValues::new();
        values.set(FieldKey::Name, name.as_str());
        values.set(FieldKey::CarYear, year.as_str());
        values.set(FieldKey::Days, days.as_str());
        values.set(FieldKey::Cvv, cvv.as_str());
        let validator = Validator::new(fixed_today()).unwrap();
        let first = validator.validate(&values).unwrap();
        let second = validator.validate(&values).unwrap();
        prop_assert_eq!(first, second);
    }
}

use cyoa_server::domain::Verdict;

#[test]
fn given_plain_answers_when_parsing_then_recognised() {
    assert_eq!(Verdict::parse("YES"), Verdict::Yes);
    assert_eq!(Verdict::parse("no."), Verdict::No);
    assert_eq!(Verdict::parse("  True\n"), Verdict::Yes);
    assert_eq!(Verdict::parse("FAIL"), Verdict::No);
}

#[test]
fn given_explanation_when_parsing_then_first_recognised_word_wins() {
    assert_eq!(Verdict::parse("No, saying yes would be wrong."), Verdict::No);
    assert_eq!(Verdict::parse("Answer: yes. No issues remain."), Verdict::Yes);
}

#[test]
fn given_words_containing_answers_when_parsing_then_not_matched() {
    assert_eq!(Verdict::parse("Nothing to report, yesterday was fine"), Verdict::Unclear);
}

#[test]
fn given_unclear_answer_when_defaulting_then_default_used() {
    let verdict = Verdict::parse("maybe");

    assert_eq!(verdict, Verdict::Unclear);
    assert!(!verdict.is_yes_or(false));
    assert!(verdict.is_yes_or(true));
}

use cyoa_server::application::services::clean_transcript;

#[test]
fn given_trailing_sign_off_when_cleaning_then_removed() {
    assert_eq!(
        clean_transcript("I open the door. Thank you for watching!"),
        "I open the door."
    );
}

#[test]
fn given_stacked_sign_offs_when_cleaning_then_all_removed() {
    assert_eq!(clean_transcript("Go north. Thanks. Bye bye."), "Go north.");
}

#[test]
fn given_messy_whitespace_when_cleaning_then_collapsed() {
    assert_eq!(
        clean_transcript("  I   draw\n my sword  "),
        "I draw my sword"
    );
}

#[test]
fn given_only_sign_off_when_cleaning_then_kept() {
    assert_eq!(clean_transcript("Thank you."), "Thank you.");
}

#[test]
fn given_phrase_inside_sentence_when_cleaning_then_untouched() {
    assert_eq!(
        clean_transcript("I say thank you to the guard and leave"),
        "I say thank you to the guard and leave"
    );
    assert_eq!(clean_transcript("I answer yes"), "I answer yes");
}

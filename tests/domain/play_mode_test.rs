use cyoa_server::domain::{MODERATED_MODEL, PlayMode, STORYTELLER_ONLY_MODEL, TEST_MODEL};

#[test]
fn given_advertised_model_names_when_selecting_mode_then_each_maps_to_its_mode() {
    assert_eq!(PlayMode::from_model_name(MODERATED_MODEL), PlayMode::Moderated);
    assert_eq!(
        PlayMode::from_model_name(STORYTELLER_ONLY_MODEL),
        PlayMode::StorytellerOnly
    );
    assert_eq!(PlayMode::from_model_name(TEST_MODEL), PlayMode::Test);
}

#[test]
fn given_prefixed_model_name_when_selecting_mode_then_substring_decides() {
    assert_eq!(
        PlayMode::from_model_name("openwebui/gameserver-cyoa-test"),
        PlayMode::Test
    );
    assert_eq!(PlayMode::from_model_name("anything-else"), PlayMode::Moderated);
}

#[test]
fn given_modes_when_checking_judge_then_only_moderated_runs_it() {
    assert!(PlayMode::Moderated.runs_judge());
    assert!(!PlayMode::StorytellerOnly.runs_judge());
    assert!(!PlayMode::Test.runs_judge());
}

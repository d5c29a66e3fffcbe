//! End-to-end episode compilation through the public pipeline API.

mod common;

use common::{BeatBuilder, EpisodeBuilder, SceneBuilder, TestHarness};
use pretty_assertions::assert_eq;

use beatframe::models::{
    ArcPhase, CameraAngle, HelmetState, RuleStatus, ShotType, TimeOfDay, TimeProvenance,
    ValidationRule,
};
use beatframe::services::Pipeline;

#[tokio::test]
async fn test_climax_beat_gets_arc_framing_after_hinted_beats() {
    let harness = TestHarness::new();
    let episode = EpisodeBuilder::new(3)
        .scene(
            SceneBuilder::new(7, "EXT. DESERT ROAD - NIGHT")
                .phase(ArcPhase::Climax)
                .intensity(9)
                .beat(
                    BeatBuilder::new("s7-b1")
                        .text("Cat and Daniel face the convoy.")
                        .character("Cat")
                        .character("Daniel")
                        .camera(ShotType::Medium, CameraAngle::EyeLevel),
                )
                .beat(
                    BeatBuilder::new("s7-b2")
                        .text("Headlights sweep over them.")
                        .character("Cat")
                        .character("Daniel")
                        .camera(ShotType::Medium, CameraAngle::EyeLevel),
                )
                .beat(
                    BeatBuilder::new("s7-b3")
                        .text("Cat steps forward.")
                        .character("Cat")
                        .character("Daniel"),
                ),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    assert_eq!(results.totals.compiled, 3);

    // Arc framing differs from the two hinted beats: no adjustment.
    let last = results.find("s7-b3").unwrap();
    assert_ne!((last.shot, last.angle), (ShotType::Medium, CameraAngle::EyeLevel));
    assert_eq!(last.shot, ShotType::CloseUp);
    assert_eq!(last.angle, CameraAngle::LowAngle);
    assert!(!last.variety_adjusted);

    let text = last.prompt.text();
    assert!(text.contains("ct_rider"), "{}", text);
    assert!(text.contains("dn_medic"), "{}", text);
    assert!(text.contains("high-contrast chiaroscuro lighting"), "{}", text);
    assert!(text.contains("cold moonlight"), "{}", text);
    assert!(last.prompt.report().unrepaired().is_empty());
    assert_eq!(
        last.prompt.report().status(ValidationRule::CharacterPresence),
        Some(RuleStatus::Pass)
    );
}

#[tokio::test]
async fn test_climax_framing_repeating_hints_is_adjusted() {
    let harness = TestHarness::new();
    let hinted = |id: &str| {
        BeatBuilder::new(id)
            .text("Cat stares down the convoy.")
            .character("Cat")
            .camera(ShotType::CloseUp, CameraAngle::LowAngle)
    };
    let episode = EpisodeBuilder::new(3)
        .scene(
            SceneBuilder::new(7, "EXT. DESERT ROAD - NIGHT")
                .phase(ArcPhase::Climax)
                .intensity(9)
                .beat(hinted("s7-b1"))
                .beat(hinted("s7-b2"))
                .beat(BeatBuilder::new("s7-b3").text("Cat steps forward.").character("Cat")),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    let last = results.get(7, "s7-b3").unwrap();
    assert!(last.variety_adjusted);
    assert_eq!(last.shot, ShotType::MediumCloseUp);
    assert_eq!(last.angle, CameraAngle::LowAngle);
    assert!(last
        .prompt
        .report()
        .warnings
        .iter()
        .any(|w| w.starts_with("ADJUSTED")));
    assert!(last.prompt.text().contains("high-contrast chiaroscuro lighting"));
    assert_eq!(results.totals.variety_adjustments, 1);
}

#[tokio::test]
async fn test_long_hinted_run_never_holds_three_identical() {
    let harness = TestHarness::new();
    let mut scene = SceneBuilder::new(1, "EXT. DESERT ROAD - DUSK");
    for n in 1..=4 {
        scene = scene.beat(
            BeatBuilder::new(format!("b{}", n))
                .text("They wait.")
                .character("Cat")
                .camera(ShotType::Medium, CameraAngle::EyeLevel),
        );
    }
    let episode = EpisodeBuilder::new(1).scene(scene).build();

    let results = harness.pipeline().run_episode(&episode).await;
    let pairs: Vec<_> = results.ordered().iter().map(|r| (r.shot, r.angle)).collect();
    assert_eq!(pairs.len(), 4);
    for window in pairs.windows(3) {
        assert!(
            !(window[0] == window[1] && window[1] == window[2]),
            "{:?}",
            pairs
        );
    }
    assert!(results.get(1, "b3").unwrap().variety_adjusted);
    assert!(!results.get(1, "b4").unwrap().variety_adjusted);
}

#[tokio::test]
async fn test_beat_ids_reused_across_scenes_are_all_kept() {
    let harness = TestHarness::new();
    let episode = EpisodeBuilder::new(1)
        .scene(
            SceneBuilder::new(1, "EXT. DESERT ROAD - NIGHT")
                .beat(BeatBuilder::new("b1").text("Cat rides.").character("Cat")),
        )
        .scene(
            SceneBuilder::new(2, "INT. MEDICAL BASE - NIGHT")
                .location("Medical Base")
                .beat(BeatBuilder::new("b1").text("Daniel waits.").character("Daniel"))
                .beat(BeatBuilder::new("b1").text("Daniel waits again.").character("Daniel")),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    assert_eq!(results.totals.beats, 3);
    assert_eq!(results.totals.compiled, 2);
    assert_eq!(results.totals.failed, 1);
    assert_eq!(results.results.len() + results.totals.failed, 3);
    assert_eq!(results.failures[0].scene_id, "ep1-s2");
    assert!(results.get(1, "b1").unwrap().prompt.text().contains("ct_rider"));
    assert!(results.get(2, "b1").unwrap().prompt.text().contains("dn_medic"));
    assert_eq!(results.find_all("b1").len(), 2);
}

#[tokio::test]
async fn test_third_repeated_hint_is_adjusted() {
    let harness = TestHarness::new();
    let hinted = |id: &str| {
        BeatBuilder::new(id)
            .text("They wait.")
            .character("Cat")
            .camera(ShotType::Medium, CameraAngle::EyeLevel)
    };
    let episode = EpisodeBuilder::new(1)
        .scene(
            SceneBuilder::new(1, "EXT. DESERT ROAD - DUSK")
                .beat(hinted("b1"))
                .beat(hinted("b2"))
                .beat(hinted("b3")),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    let third = results.find("b3").unwrap();
    assert_eq!(third.shot, ShotType::MediumWide);
    assert_eq!(third.angle, CameraAngle::EyeLevel);
    assert!(third.variety_adjusted);
    assert!(third
        .prompt
        .report()
        .warnings
        .iter()
        .any(|w| w.starts_with("ADJUSTED")));
    assert_eq!(results.totals.variety_adjustments, 1);

    // The second beat only repeats once: a warning, no adjustment.
    let second = results.find("b2").unwrap();
    assert_eq!(second.shot, ShotType::Medium);
    assert!(!second.variety_adjusted);
}

#[tokio::test]
async fn test_time_flows_through_episode() {
    let episode = EpisodeBuilder::new(2)
        .starting_time(TimeOfDay::Dusk)
        .scene(SceneBuilder::new(1, "EXT. DESERT ROAD").beat(BeatBuilder::new("a").text("Wind.")))
        .scene(
            SceneBuilder::new(2, "INT. MEDICAL BASE - NIGHT")
                .location("Medical Base")
                .beat(BeatBuilder::new("b").text("Daniel checks the IV.")),
        )
        .scene(
            SceneBuilder::new(3, "EXT. DESERT ROAD")
                .beat(BeatBuilder::new("c").text("The next morning, engines start.")),
        )
        .build();

    let times = Pipeline::resolve_times(&episode);
    assert_eq!(times[0].time(), TimeOfDay::Dusk);
    assert_eq!(times[0].provenance(), TimeProvenance::Continued);
    assert_eq!(times[1].time(), TimeOfDay::Night);
    assert_eq!(times[1].provenance(), TimeProvenance::Detected);
    assert_eq!(times[2].provenance(), TimeProvenance::Jump);
    assert_eq!(times[2].time(), TimeOfDay::Morning);

    let harness = TestHarness::new();
    let results = harness.pipeline().run_episode(&episode).await;
    assert_eq!(results.ending_time, Some(TimeOfDay::Morning));
    assert!(results.find("b").unwrap()
        .prompt
        .text()
        .contains("low-key practical lighting"));
}

#[test]
fn test_dialogue_does_not_move_the_clock() {
    let episode = EpisodeBuilder::new(2)
        .scene(SceneBuilder::new(1, "EXT. DESERT ROAD - DUSK").beat(BeatBuilder::new("a").text("Wind.")))
        .scene(
            SceneBuilder::new(2, "EXT. DESERT ROAD").beat(
                BeatBuilder::new("b").text(r#"Daniel waves. "See you the next morning, Cat.""#),
            ),
        )
        .build();

    let times = Pipeline::resolve_times(&episode);
    assert_eq!(times[1].provenance(), TimeProvenance::Continued);
    assert_ne!(times[1].time(), TimeOfDay::Morning);
}

#[tokio::test]
async fn test_helmeted_rider_loses_face_tag() {
    let harness = TestHarness::new();
    let episode = EpisodeBuilder::new(1)
        .scene(
            SceneBuilder::new(1, "EXT. DESERT ROAD - MIDDAY").beat(
                BeatBuilder::new("ride")
                    .text("Cat rides, visor down.")
                    .character_with("Cat", Some("leaning into the turn"), None)
                    .helmet(HelmetState::VisorDown)
                    .vehicle("dirt bike"),
            ),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    let result = results.find("ride").unwrap();
    let text = result.prompt.text();
    assert!(text.contains("dirt bike"));
    assert!(text.contains("leaning into the turn"));
    assert!(!text.contains("<segment:"));
    assert_eq!(
        result.prompt.report().status(ValidationRule::VisorConsistency),
        Some(RuleStatus::Pass)
    );
}

#[tokio::test]
async fn test_unknown_character_degrades_with_warning() {
    let harness = TestHarness::new();
    let episode = EpisodeBuilder::new(1)
        .scene(
            SceneBuilder::new(1, "EXT. DESERT ROAD - DAWN")
                .beat(BeatBuilder::new("b1").text("A stranger waves.").character("Stranger")),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    let result = results.find("b1").unwrap();
    assert!(result.prompt.text().contains("Stranger"));
    assert!(result
        .prompt
        .report()
        .warnings
        .iter()
        .any(|w| w.contains("no character context for 'Stranger'")));
    assert!(results.failures.is_empty());
}

#[tokio::test]
async fn test_structural_failures_are_collected() {
    let harness = TestHarness::new();
    let episode = EpisodeBuilder::new(1)
        .scene(
            SceneBuilder::new(1, "EXT. DESERT ROAD - NIGHT")
                .beat(BeatBuilder::new("ok").text("Fine."))
                .beat(BeatBuilder::without_id().text("Broken.")),
        )
        .scene(
            SceneBuilder::new(2, "EXT. DESERT ROAD - NIGHT")
                .beat(BeatBuilder::new("also-ok").text("Fine again.")),
        )
        .build();

    let results = harness.pipeline().run_episode(&episode).await;
    assert_eq!(results.totals.beats, 3);
    assert_eq!(results.totals.compiled, 2);
    assert_eq!(results.totals.failed, 1);
    assert_eq!(results.failures[0].beat_id, "#2");
    assert_eq!(results.failures[0].scene_id, "ep1-s1");
}

#[tokio::test]
async fn test_ending_time_chains_into_next_episode() {
    let harness = TestHarness::new();
    let store = harness.store();

    let first = EpisodeBuilder::new(1)
        .scene(
            SceneBuilder::new(1, "EXT. DESERT ROAD - GOLDEN HOUR")
                .beat(BeatBuilder::new("e1-b1").text("Sun low.")),
        )
        .build();
    let results = harness.pipeline().run_episode(&first).await;
    store.save(&results).unwrap();

    let mut second = EpisodeBuilder::new(2)
        .scene(SceneBuilder::new(1, "EXT. DESERT ROAD").beat(BeatBuilder::new("e2-b1").text("Still riding.")))
        .build();
    second.starting_time = store.previous_ending_time(&second.story_id, second.episode_number);
    assert_eq!(second.starting_time, Some(TimeOfDay::GoldenHour));

    let times = Pipeline::resolve_times(&second);
    assert_eq!(times[0].time(), TimeOfDay::GoldenHour);
    assert_eq!(times[0].provenance(), TimeProvenance::Continued);
}

#[tokio::test]
async fn test_concurrency_does_not_change_output() {
    let mut harness = TestHarness::new();
    let mut builder = EpisodeBuilder::new(1);
    for n in 1..=4 {
        builder = builder.scene(
            SceneBuilder::new(n, "EXT. DESERT ROAD - NIGHT")
                .phase(ArcPhase::Rising)
                .beat(BeatBuilder::new(format!("s{}-b1", n)).text("Cat rides.").character("Cat"))
                .beat(BeatBuilder::new(format!("s{}-b2", n)).text("Cat stops.").character("Cat")),
        );
    }
    let episode = builder.build();

    harness.config.max_concurrent_scenes = 1;
    let sequential = harness.pipeline().run_episode(&episode).await;
    harness.config.max_concurrent_scenes = 4;
    let parallel = harness.pipeline().run_episode(&episode).await;

    let texts = |set: &beatframe::models::EpisodeResultSet| -> Vec<String> {
        set.ordered()
            .iter()
            .map(|r| r.prompt.text().to_string())
            .collect()
    };
    assert_eq!(texts(&sequential), texts(&parallel));
    assert_eq!(sequential.totals, parallel.totals);
}

//! Phase C: deterministic assembly of a Visual Beat Spec into prompt text.
//!
//! Fields are emitted in `PromptField::ORDER` and joined with ", ". Face
//! tags follow after a single space, concatenated with no separator. When the
//! estimate exceeds the budget, whole fields are dropped in the constraint's
//! drop order until it fits.

use crate::models::{CompiledPrompt, FaceTagPolicy, PromptField, SubjectBlock, VisualBeatSpec};
use crate::utils::tokens::estimate_tokens;

const SEPARATOR: &str = ", ";

/// Subjects in left-to-right screen order. Ties keep beat order.
pub fn ordered_subjects(vbs: &VisualBeatSpec) -> Vec<&SubjectBlock> {
    let mut subjects: Vec<&SubjectBlock> = vbs.subjects.iter().collect();
    subjects.sort_by_key(|s| s.position);
    subjects
}

/// Face tags for the subjects the policy covers, in screen order.
pub fn face_tags(vbs: &VisualBeatSpec) -> String {
    ordered_subjects(vbs)
        .into_iter()
        .filter(|s| match vbs.constraints.face_tag_policy {
            FaceTagPolicy::VisibleFaces => s.face_visible,
            FaceTagPolicy::AllSubjects => true,
            FaceTagPolicy::Disabled => false,
        })
        .filter_map(|s| s.face_tag.as_deref())
        .map(str::trim)
        .collect::<Vec<_>>()
        .concat()
}

/// Text of one field, `None` when it has nothing to emit.
pub fn field_text(vbs: &VisualBeatSpec, field: PromptField) -> Option<String> {
    let join = |items: &[String]| {
        let parts: Vec<&str> = items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(SEPARATOR))
    };
    let text = match field {
        PromptField::Shot => Some(vbs.shot.as_str().to_string()),
        PromptField::DepthOfField => Some(vbs.depth_of_field.as_str().to_string()),
        PromptField::Angle => Some(vbs.angle.as_str().to_string()),
        PromptField::Composition => Some(vbs.composition.text().to_string()),
        PromptField::Subjects => join(
            &ordered_subjects(vbs)
                .into_iter()
                .map(|s| s.describe())
                .collect::<Vec<_>>(),
        ),
        PromptField::Location => join(&[
            vbs.environment.location.clone(),
            vbs.environment.visual.clone(),
        ]),
        PromptField::Anchors => join(&vbs.environment.anchors),
        PromptField::Props => join(&vbs.environment.props),
        PromptField::Lighting => join(&vbs.environment.lighting),
        PromptField::Atmosphere => join(&vbs.environment.atmosphere),
        PromptField::ColorGrade => Some(vbs.environment.color_grade.clone()),
        PromptField::FaceTags => Some(face_tags(vbs)),
    };
    text.filter(|t| !t.trim().is_empty())
}

/// Assemble prompt text from the fields not in `excluded`.
fn assemble(vbs: &VisualBeatSpec, excluded: &[PromptField]) -> String {
    let mut segments = Vec::new();
    let mut tags = String::new();
    for field in PromptField::ORDER {
        if excluded.contains(&field) {
            continue;
        }
        let Some(text) = field_text(vbs, field) else {
            continue;
        };
        if field == PromptField::FaceTags {
            tags = text;
        } else {
            segments.push(text);
        }
    }
    let mut prompt = segments.join(SEPARATOR);
    if !tags.is_empty() {
        if !prompt.is_empty() {
            prompt.push(' ');
        }
        prompt.push_str(&tags);
    }
    prompt
}

/// Compile a VBS into prompt text within its token budget.
pub fn compile(vbs: &VisualBeatSpec) -> CompiledPrompt {
    let max = vbs.constraints.budget.max;
    let mut dropped: Vec<PromptField> = Vec::new();
    let mut text = assemble(vbs, &dropped);

    let mut candidates = vbs
        .constraints
        .droppable()
        .filter(|f| field_text(vbs, *f).is_some());
    while estimate_tokens(&text) > max {
        let Some(field) = candidates.next() else {
            tracing::debug!(
                beat_id = %vbs.beat_id,
                tokens = estimate_tokens(&text),
                max,
                "Prompt over budget with nothing left to drop"
            );
            break;
        };
        dropped.push(field);
        text = assemble(vbs, &dropped);
    }

    if !dropped.is_empty() {
        tracing::debug!(beat_id = %vbs.beat_id, ?dropped, "Dropped fields for budget");
    }
    let estimate = estimate_tokens(&text);
    CompiledPrompt::new(vbs.beat_id.clone(), text, estimate, dropped)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        CameraAngle, DepthOfField, EnvironmentBlock, HelmetState, PromptConstraints, SceneKey,
        ScreenPosition, Setting, ShotType, Slot, TimeContext, TimeOfDay, TimeProvenance,
        TokenBudget,
    };

    pub(crate) fn subject(id: &str, trigger: &str, position: ScreenPosition) -> SubjectBlock {
        SubjectBlock {
            character_id: id.into(),
            trigger: trigger.into(),
            appearance: format!("{} appearance", id.to_lowercase()),
            action: Slot::absent(),
            expression: Slot::absent(),
            position,
            face_visible: true,
            helmet: HelmetState::Off,
            face_tag: None,
            fallback: false,
        }
    }

    pub(crate) fn sample_vbs() -> VisualBeatSpec {
        let mut daniel = subject("Daniel", "dn_medic", ScreenPosition::Right);
        daniel.action = Slot::authored("kneeling by the cot");
        daniel.face_tag = Some("<segment:face-2>".into());
        let mut cat = subject("Cat", "ct_rider", ScreenPosition::Left);
        cat.expression = Slot::authored("focused frown");
        cat.face_tag = Some("<segment:face-1>".into());

        VisualBeatSpec {
            beat_id: "s1-b3".into(),
            scene: SceneKey {
                episode: 1,
                scene: 1,
            },
            shot: ShotType::MediumCloseUp,
            angle: CameraAngle::LowAngle,
            depth_of_field: DepthOfField::Shallow,
            composition: Slot::deterministic("two-shot"),
            // Beat order puts Daniel first; screen order puts Cat first.
            subjects: vec![daniel, cat],
            environment: EnvironmentBlock {
                location: "medical base".into(),
                visual: "trailer clinic".into(),
                anchors: vec!["IV stand".into()],
                props: vec![],
                lighting: vec!["cold moonlight".into()],
                atmosphere: vec!["humming generators".into()],
                color_grade: "cold neutral white grade".into(),
                setting: Some(Setting::Interior),
                fallback: false,
            },
            constraints: PromptConstraints {
                budget: TokenBudget { min: 10, max: 500 },
                face_tag_policy: FaceTagPolicy::VisibleFaces,
                drop_order: PromptField::default_drop_order(),
                required: vec![
                    PromptField::Shot,
                    PromptField::Angle,
                    PromptField::Subjects,
                    PromptField::Location,
                ],
            },
            time: TimeContext::new(
                TimeOfDay::Night,
                Some(Setting::Interior),
                TimeProvenance::Detected,
                None,
            ),
            reason: String::new(),
            variety_adjusted: false,
            needs_fill_in: false,
            narrative: String::new(),
            notes: vec![],
        }
    }

    #[test]
    fn test_fixed_order_and_joining() {
        let prompt = compile(&sample_vbs());
        insta::assert_snapshot!(prompt.text(), @"medium close-up, shallow depth of field, low angle, two-shot, ct_rider, cat appearance, focused frown, dn_medic, daniel appearance, kneeling by the cot, medical base, trailer clinic, IV stand, cold moonlight, humming generators, cold neutral white grade <segment:face-1><segment:face-2>");
        assert!(prompt.dropped().is_empty());
        assert_eq!(prompt.token_estimate(), estimate_tokens(prompt.text()));
    }

    #[test]
    fn test_hidden_face_gets_no_tag() {
        let mut vbs = sample_vbs();
        vbs.subjects[0].face_visible = false;
        vbs.subjects[0].helmet = HelmetState::VisorDown;
        assert_eq!(face_tags(&vbs), "<segment:face-1>");

        vbs.constraints.face_tag_policy = FaceTagPolicy::Disabled;
        assert_eq!(field_text(&vbs, PromptField::FaceTags), None);
    }

    #[test]
    fn test_drops_whole_fields_in_order() {
        let mut vbs = sample_vbs();
        let full = compile(&vbs);
        let without_atmosphere = assemble(&vbs, &[PromptField::Atmosphere]);

        vbs.constraints.budget.max = estimate_tokens(&without_atmosphere);
        let prompt = compile(&vbs);
        assert!(full.token_estimate() > vbs.constraints.budget.max);
        assert_eq!(prompt.dropped(), &[PromptField::Atmosphere]);
        assert!(!prompt.text().contains("humming generators"));
        assert!(prompt.text().contains("IV stand"));
    }

    #[test]
    fn test_required_fields_never_dropped() {
        let mut vbs = sample_vbs();
        vbs.constraints.budget.max = 1;
        vbs.constraints.drop_order.push(PromptField::Subjects);
        let prompt = compile(&vbs);
        assert!(prompt.text().contains("ct_rider"));
        assert!(prompt.text().starts_with("medium close-up"));
        assert!(!prompt.dropped().contains(&PromptField::Subjects));
    }

    #[test]
    fn test_empty_fields_skipped_without_stray_separators() {
        let mut vbs = sample_vbs();
        vbs.composition = Slot::absent();
        vbs.environment.anchors.clear();
        vbs.environment.atmosphere.clear();
        let text = compile(&vbs).text().to_string();
        assert!(!text.contains(", ,"));
        assert!(text.contains("low angle, ct_rider"));
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Truncation stops as soon as the prompt fits, and never splits a field.
            #[test]
            fn truncation_is_minimal(max in 1usize..120) {
                let mut vbs = sample_vbs();
                vbs.constraints.budget.max = max;
                let prompt = compile(&vbs);
                let dropped = prompt.dropped().to_vec();

                if let Some((_, kept)) = dropped.split_last() {
                    // One field fewer dropped would still be over budget.
                    let previous = assemble(&vbs, kept);
                    prop_assert!(estimate_tokens(&previous) > max);
                }
                for field in PromptField::ORDER {
                    if dropped.contains(&field) {
                        continue;
                    }
                    if let Some(text) = field_text(&vbs, field) {
                        prop_assert!(prompt.text().contains(&text));
                    }
                }
            }
        }
    }
}

use super::geometry::{angle, angle_to_vertical, line_y_at_x, midpoint, vector};
use super::{FormFlag, RuleResult};
use crate::pose::{Frame, LandmarkIndex};

/// スクワット: 膝角度（最小側）がこれを超えると浅い
pub const SQUAT_DEPTH_MAX_KNEE_ANGLE: f32 = 150.0;
/// スクワット: 体幹の鉛直からの傾き上限
pub const SQUAT_MAX_TORSO_LEAN: f32 = 40.0;
/// 腕立て・プランク: 肩–足首ラインからの腰の許容ずれ
pub const BODY_LINE_TOLERANCE: f32 = 0.1;
/// 腹筋: 肩が腰よりこれ以上上がっていないと可動域不足
pub const SIT_UP_MIN_TRUNK_RISE: f32 = 0.1;

pub const MSG_DEPTH_LOW: &str = "Go deeper to at least parallel.";
pub const MSG_KNEES_IN: &str = "Push knees outward over toes.";
pub const MSG_CHEST_UP: &str = "Keep chest up.";
pub const MSG_PIKE: &str = "Keep a straight line from head to heels.";
pub const MSG_SAG: &str = "Avoid sagging hips.";
pub const MSG_PLANK_OK: &str = "Maintain a straight line from shoulders to heels.";
pub const MSG_LOW_ROM: &str = "Increase trunk flexion.";

/// ルールが定義されている種目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exercise {
    Squat,
    PushUp,
    Plank,
    SitUp,
}

impl Exercise {
    /// モデルのクラス名から種目を取得（完全一致）
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name {
            "squat" => Some(Self::Squat),
            "push_up" => Some(Self::PushUp),
            "plank" => Some(Self::Plank),
            "sit_up" => Some(Self::SitUp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::PushUp => "push_up",
            Self::Plank => "plank",
            Self::SitUp => "sit_up",
        }
    }

    pub fn apply(&self, frame: &Frame, result: &mut RuleResult) {
        match self {
            Self::Squat => squat(frame, result),
            Self::PushUp => body_line(frame, result),
            Self::Plank => plank(frame, result),
            Self::SitUp => sit_up(frame, result),
        }
    }
}

fn squat(lm: &Frame, result: &mut RuleResult) {
    use LandmarkIndex::*;
    let (l_hip, r_hip) = (lm.get(LeftHip), lm.get(RightHip));
    let (l_knee, r_knee) = (lm.get(LeftKnee), lm.get(RightKnee));
    let (l_ankle, r_ankle) = (lm.get(LeftAnkle), lm.get(RightAnkle));

    let hip_center = midpoint(l_hip, r_hip);
    let shoulder_center = midpoint(lm.get(LeftShoulder), lm.get(RightShoulder));

    // 深さ: 左右で深い方の膝角度
    let min_knee = angle(l_hip, l_knee, l_ankle).min(angle(r_hip, r_knee, r_ankle));
    if min_knee > SQUAT_DEPTH_MAX_KNEE_ANGLE {
        result.flag(FormFlag::DepthLow, MSG_DEPTH_LOW);
    }

    // ニーイン: 両膝とも足首より腰中心に近い
    let knee_in = |knee: f32, ankle: f32| {
        (knee - hip_center.x).abs() < (ankle - hip_center.x).abs()
    };
    if knee_in(l_knee.x, l_ankle.x) && knee_in(r_knee.x, r_ankle.x) {
        result.flag(FormFlag::KneesIn, MSG_KNEES_IN);
    }

    let torso_lean = angle_to_vertical(&vector(&shoulder_center, &hip_center));
    if torso_lean > SQUAT_MAX_TORSO_LEAN {
        result.flag(FormFlag::ChestUp, MSG_CHEST_UP);
    }
}

/// 肩–足首ラインに対する腰の上下ずれ（正: 腰が下がっている）
pub fn sag_metric(lm: &Frame) -> f32 {
    use LandmarkIndex::*;
    let shoulder = midpoint(lm.get(LeftShoulder), lm.get(RightShoulder));
    let hip = midpoint(lm.get(LeftHip), lm.get(RightHip));
    let ankle = midpoint(lm.get(LeftAnkle), lm.get(RightAnkle));
    hip.y - line_y_at_x(&shoulder, &ankle, hip.x)
}

fn body_line(lm: &Frame, result: &mut RuleResult) {
    let sag = sag_metric(lm);
    if sag < -BODY_LINE_TOLERANCE {
        result.flag(FormFlag::Pike, MSG_PIKE);
    } else if sag > BODY_LINE_TOLERANCE {
        result.flag(FormFlag::Sag, MSG_SAG);
    }
}

fn plank(lm: &Frame, result: &mut RuleResult) {
    body_line(lm, result);
    if result.flags.is_empty() {
        result.note(MSG_PLANK_OK);
    }
}

fn sit_up(lm: &Frame, result: &mut RuleResult) {
    use LandmarkIndex::*;
    let shoulder = midpoint(lm.get(LeftShoulder), lm.get(RightShoulder));
    let hip = midpoint(lm.get(LeftHip), lm.get(RightHip));
    if shoulder.y - hip.y > -SIT_UP_MIN_TRUNK_RISE {
        result.flag(FormFlag::LowRom, MSG_LOW_ROM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;
    use crate::rules::evaluate;

    fn set(frame: &mut Frame, index: LandmarkIndex, x: f32, y: f32) {
        frame.set(index, Landmark::new(x, y, 0.0, 0.9));
    }

    /// 膝角度を指定したスクワット姿勢
    /// 腰は膝の真上、足首は膝から内側へ回転させる
    fn squat_frame(knee_angle_deg: f32) -> Frame {
        use LandmarkIndex::*;
        let mut frame = Frame::default();
        let phi = (180.0 - knee_angle_deg).to_radians();
        let shin = 0.2;

        for (hip, knee, ankle, x, inward) in [
            (LeftHip, LeftKnee, LeftAnkle, 0.3f32, 1.0f32),
            (RightHip, RightKnee, RightAnkle, 0.7, -1.0),
        ] {
            set(&mut frame, hip, x, 0.4);
            set(&mut frame, knee, x, 0.6);
            set(&mut frame, ankle, x + inward * shin * phi.sin(), 0.6 + shin * phi.cos());
        }
        // 肩→腰が -Y 方向（傾き 0°）
        set(&mut frame, LeftShoulder, 0.3, 0.7);
        set(&mut frame, RightShoulder, 0.7, 0.7);
        frame
    }

    fn push_up_frame(hip_y: f32) -> Frame {
        use LandmarkIndex::*;
        let mut frame = Frame::default();
        set(&mut frame, LeftShoulder, 0.2, 0.5);
        set(&mut frame, RightShoulder, 0.2, 0.5);
        set(&mut frame, LeftHip, 0.5, hip_y);
        set(&mut frame, RightHip, 0.5, hip_y);
        set(&mut frame, LeftAnkle, 0.8, 0.5);
        set(&mut frame, RightAnkle, 0.8, 0.5);
        frame
    }

    #[test]
    fn test_exercise_from_class_name() {
        assert_eq!(Exercise::from_class_name("squat"), Some(Exercise::Squat));
        assert_eq!(Exercise::from_class_name("push_up"), Some(Exercise::PushUp));
        assert_eq!(Exercise::from_class_name("plank"), Some(Exercise::Plank));
        assert_eq!(Exercise::from_class_name("sit_up"), Some(Exercise::SitUp));
        assert_eq!(Exercise::from_class_name("rest"), None);
        assert_eq!(Exercise::from_class_name("Squat"), None);
        for e in [Exercise::Squat, Exercise::PushUp, Exercise::Plank, Exercise::SitUp] {
            assert_eq!(Exercise::from_class_name(e.as_str()), Some(e));
        }
    }

    #[test]
    fn test_squat_frame_geometry() {
        use LandmarkIndex::*;
        let frame = squat_frame(170.0);
        let a = angle(frame.get(LeftHip), frame.get(LeftKnee), frame.get(LeftAnkle));
        assert!((a - 170.0).abs() < 0.1, "angle={}", a);
    }

    #[test]
    fn test_squat_shallow_flags_depth_low() {
        let result = evaluate("squat", &squat_frame(170.0));
        assert!(result.contains(FormFlag::DepthLow));
        assert!(result.messages.contains(&MSG_DEPTH_LOW.to_string()));
    }

    #[test]
    fn test_squat_parallel_no_depth_low() {
        let result = evaluate("squat", &squat_frame(90.0));
        assert!(!result.contains(FormFlag::DepthLow));
    }

    #[test]
    fn test_squat_upright_torso_no_chest_up() {
        let result = evaluate("squat", &squat_frame(90.0));
        assert!(!result.contains(FormFlag::ChestUp));
        assert!(!result.contains(FormFlag::KneesIn));
        assert!(result.is_empty());
    }

    #[test]
    fn test_squat_leaning_torso_flags_chest_up() {
        use LandmarkIndex::*;
        let mut frame = squat_frame(90.0);
        // 肩→腰が水平（90°）
        set(&mut frame, LeftShoulder, 0.2, 0.4);
        set(&mut frame, RightShoulder, 0.2, 0.4);
        let result = evaluate("squat", &frame);
        assert!(result.contains(FormFlag::ChestUp));
        assert_eq!(result.messages, vec![MSG_CHEST_UP]);
    }

    #[test]
    fn test_squat_knees_in() {
        use LandmarkIndex::*;
        let mut frame = squat_frame(90.0);
        // 膝が足首より内側
        set(&mut frame, LeftKnee, 0.45, 0.6);
        set(&mut frame, RightKnee, 0.55, 0.6);
        set(&mut frame, LeftAnkle, 0.35, 0.8);
        set(&mut frame, RightAnkle, 0.65, 0.8);
        let result = evaluate("squat", &frame);
        assert!(result.contains(FormFlag::KneesIn));
        assert!(result.messages.contains(&MSG_KNEES_IN.to_string()));
    }

    #[test]
    fn test_squat_one_knee_out_not_flagged() {
        use LandmarkIndex::*;
        let mut frame = squat_frame(90.0);
        set(&mut frame, LeftKnee, 0.45, 0.6);
        set(&mut frame, LeftAnkle, 0.35, 0.8);
        set(&mut frame, RightKnee, 0.7, 0.6);
        set(&mut frame, RightAnkle, 0.65, 0.8);
        assert!(!evaluate("squat", &frame).contains(FormFlag::KneesIn));
    }

    #[test]
    fn test_squat_messages_follow_rule_order() {
        use LandmarkIndex::*;
        let mut frame = squat_frame(170.0);
        set(&mut frame, LeftShoulder, 0.2, 0.4);
        set(&mut frame, RightShoulder, 0.2, 0.4);
        let result = evaluate("squat", &frame);
        assert_eq!(result.messages, vec![MSG_DEPTH_LOW, MSG_CHEST_UP]);
    }

    #[test]
    fn test_push_up_sag() {
        let result = evaluate("push_up", &push_up_frame(0.65));
        assert!(result.contains(FormFlag::Sag));
        assert!(!result.contains(FormFlag::Pike));
        assert_eq!(result.messages, vec![MSG_SAG]);
    }

    #[test]
    fn test_push_up_pike() {
        let result = evaluate("push_up", &push_up_frame(0.35));
        assert!(result.contains(FormFlag::Pike));
        assert!(!result.contains(FormFlag::Sag));
        assert_eq!(result.messages, vec![MSG_PIKE]);
    }

    #[test]
    fn test_push_up_within_tolerance() {
        for hip_y in [0.5, 0.55, 0.45] {
            let result = evaluate("push_up", &push_up_frame(hip_y));
            assert!(result.is_empty(), "hip_y={}", hip_y);
        }
    }

    #[test]
    fn test_sag_metric_sloped_line() {
        use LandmarkIndex::*;
        let mut frame = push_up_frame(0.5);
        set(&mut frame, LeftAnkle, 0.8, 0.8);
        set(&mut frame, RightAnkle, 0.8, 0.8);
        // ライン上の x=0.5 は y=0.65
        assert!((sag_metric(&frame) + 0.15).abs() < 1e-5);
    }

    #[test]
    fn test_plank_straight_gives_affirmation() {
        let result = evaluate("plank", &push_up_frame(0.5));
        assert!(result.flags.is_empty());
        assert_eq!(result.messages, vec![MSG_PLANK_OK]);
    }

    #[test]
    fn test_plank_sag_has_no_affirmation() {
        let result = evaluate("plank", &push_up_frame(0.7));
        assert!(result.contains(FormFlag::Sag));
        assert_eq!(result.messages, vec![MSG_SAG]);
    }

    #[test]
    fn test_sit_up_low_rom() {
        use LandmarkIndex::*;
        let mut frame = Frame::default();
        set(&mut frame, LeftShoulder, 0.3, 0.5);
        set(&mut frame, RightShoulder, 0.3, 0.5);
        set(&mut frame, LeftHip, 0.6, 0.5);
        set(&mut frame, RightHip, 0.6, 0.5);
        let result = evaluate("sit_up", &frame);
        assert!(result.contains(FormFlag::LowRom));
        assert_eq!(result.messages, vec![MSG_LOW_ROM]);
    }

    #[test]
    fn test_sit_up_full_rom() {
        use LandmarkIndex::*;
        let mut frame = Frame::default();
        set(&mut frame, LeftShoulder, 0.5, 0.2);
        set(&mut frame, RightShoulder, 0.5, 0.2);
        set(&mut frame, LeftHip, 0.6, 0.5);
        set(&mut frame, RightHip, 0.6, 0.5);
        assert!(evaluate("sit_up", &frame).is_empty());
    }

    #[test]
    fn test_visibility_ignored() {
        use LandmarkIndex::*;
        let mut frame = push_up_frame(0.65);
        frame.set(LeftHip, Landmark::new(0.5, 0.65, 0.0, 0.0));
        frame.set(RightHip, Landmark::new(0.5, 0.65, 0.0, 0.0));
        assert!(evaluate("push_up", &frame).contains(FormFlag::Sag));
    }
}

use crate::error::{AnalysisError, Result};
use crate::io::table::split_tokens;

/// Quaternion columns every eye-tracker export must carry.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "L_rot_x", "L_rot_y", "L_rot_z", "L_rot_w", "R_rot_x", "R_rot_y", "R_rot_z", "R_rot_w",
];

/// Resolved column indices for one eye-tracker export.
///
/// Required quaternion columns are exact-matched. Optional columns resolve
/// through priority-ordered, case-insensitive substring rules; the leftmost
/// header name matching a rule wins, which also settles duplicated names
/// (first occurrence).
#[derive(Debug, Clone)]
pub struct ColumnMap {
    /// Left-eye rotation quaternion indices, x y z w order.
    pub left_rot: [usize; 4],
    /// Right-eye rotation quaternion indices, x y z w order.
    pub right_rot: [usize; 4],
    pub time: Option<usize>,
    pub pupil_left: Option<usize>,
    pub pupil_right: Option<usize>,
    pub openness_left: Option<usize>,
    pub squeeze_left: Option<usize>,
    pub blink: Option<usize>,
}

fn left_labeled(name: &str) -> bool {
    name.contains("l_") || name.contains("left")
}

fn right_labeled(name: &str) -> bool {
    name.contains("r_") || name.contains("right")
}

impl ColumnMap {
    pub fn resolve(header: &str) -> Result<Self> {
        let names: Vec<&str> = split_tokens(header).collect();
        let lower: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();

        let mut missing = Vec::new();
        let mut require = |wanted: &str| -> usize {
            match names.iter().position(|n| *n == wanted) {
                Some(i) => i,
                None => {
                    missing.push(wanted.to_string());
                    usize::MAX
                }
            }
        };
        let left_rot = [
            require("L_rot_x"),
            require("L_rot_y"),
            require("L_rot_z"),
            require("L_rot_w"),
        ];
        let right_rot = [
            require("R_rot_x"),
            require("R_rot_y"),
            require("R_rot_z"),
            require("R_rot_w"),
        ];
        if !missing.is_empty() {
            return Err(AnalysisError::MissingColumns(missing));
        }

        let find = |pred: &dyn Fn(&str) -> bool| lower.iter().position(|n| pred(n));
        Ok(Self {
            left_rot,
            right_rot,
            time: find(&|n| n.contains("time")),
            pupil_left: find(&|n| n.contains("pupil") && left_labeled(n)),
            pupil_right: find(&|n| n.contains("pupil") && right_labeled(n)),
            openness_left: find(&|n| n.contains("open") && left_labeled(n)),
            squeeze_left: find(&|n| n.contains("squeeze") && left_labeled(n)),
            blink: find(&|n| n.contains("blink")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HEADER: &str = "timestamp,L_rot_x,L_rot_y,L_rot_z,L_rot_w,\
                               R_rot_x,R_rot_y,R_rot_z,R_rot_w,\
                               L_pupil_diameter,R_pupil_diameter,\
                               L_openness,L_squeeze,blink_flag";

    #[test]
    fn resolves_all_columns() {
        let map = ColumnMap::resolve(FULL_HEADER).unwrap();
        assert_eq!(map.left_rot, [1, 2, 3, 4]);
        assert_eq!(map.right_rot, [5, 6, 7, 8]);
        assert_eq!(map.time, Some(0));
        assert_eq!(map.pupil_left, Some(9));
        assert_eq!(map.pupil_right, Some(10));
        assert_eq!(map.openness_left, Some(11));
        assert_eq!(map.squeeze_left, Some(12));
        assert_eq!(map.blink, Some(13));
    }

    #[test]
    fn missing_quaternion_columns_are_enumerated() {
        let header = "time L_rot_x L_rot_y L_rot_z L_rot_w R_rot_x R_rot_y R_rot_z";
        let err = ColumnMap::resolve(header).unwrap_err();
        match err {
            AnalysisError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["R_rot_w".to_string()])
            }
            other => panic!("unexpected error {other:?}"),
        }
        let msg = ColumnMap::resolve(header).unwrap_err().to_string();
        assert!(msg.contains("R_rot_w"), "message was: {msg}");
    }

    #[test]
    fn quaternion_match_is_exact_not_substring() {
        let header = "l_rot_x L_rot_y L_rot_z L_rot_w R_rot_x R_rot_y R_rot_z R_rot_w";
        let err = ColumnMap::resolve(header).unwrap_err();
        match err {
            AnalysisError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["L_rot_x".to_string()])
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn optional_columns_are_optional() {
        let header = "L_rot_x L_rot_y L_rot_z L_rot_w R_rot_x R_rot_y R_rot_z R_rot_w";
        let map = ColumnMap::resolve(header).unwrap();
        assert_eq!(map.time, None);
        assert_eq!(map.pupil_left, None);
        assert_eq!(map.blink, None);
    }

    #[test]
    fn substring_rules_are_case_insensitive_and_leftmost() {
        let header = "L_rot_x L_rot_y L_rot_z L_rot_w R_rot_x R_rot_y R_rot_z R_rot_w \
                      Device_Time Frame_Time Left_Pupil_MM EyeBlink";
        let map = ColumnMap::resolve(header).unwrap();
        assert_eq!(map.time, Some(8)); // leftmost "time" match wins
        assert_eq!(map.pupil_left, Some(10));
        assert_eq!(map.blink, Some(11));
    }
}

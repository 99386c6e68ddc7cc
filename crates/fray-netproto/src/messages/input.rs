use fray_core::{Frame, Input};
use serde::{Deserialize, Serialize};

/// Held keys as they appear on the wire. Key names are part of the wire
/// format: `w`/`a`/`s`/`d` map to up/left/down/right.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputKeys {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
}

impl From<Input> for InputKeys {
    fn from(input: Input) -> Self {
        Self {
            w: input.up,
            a: input.left,
            s: input.down,
            d: input.right,
        }
    }
}

impl From<InputKeys> for Input {
    fn from(keys: InputKeys) -> Self {
        Self {
            up: keys.w,
            left: keys.a,
            down: keys.s,
            right: keys.d,
        }
    }
}

/// One peer's input for one frame (rollback strategy broadcast).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFrame {
    pub frame: Frame,
    pub input: InputKeys,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_map_to_directions() {
        let input = Input::new(true, false, true, false);
        let keys = InputKeys::from(input);
        assert!(keys.w && keys.s);
        assert!(!keys.a && !keys.d);
        assert_eq!(Input::from(keys), input);
    }

    #[test]
    fn wire_keys_are_locked() {
        let frame = InputFrame {
            frame: 42,
            input: InputKeys::from(Input::new(true, false, false, true)),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"frame":42,"input":{"w":true,"a":false,"s":false,"d":true}}"#
        );
    }
}

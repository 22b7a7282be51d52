use lumen_codec::command::{
    CMD_COLOR, CMD_COLOR_BRIGHTNESS, CMD_MESH_ADDRESS, CMD_POWER, CMD_PRESET,
    CMD_SEQUENCE_COLOR_DURATION, CMD_SEQUENCE_FADE_DURATION, CMD_STATUS_REQUEST,
    CMD_WHITE_BRIGHTNESS, CMD_WHITE_TEMPERATURE,
};
use lumen_core::MeshId;

/// Host-facing command vocabulary, mapped onto wire opcodes and data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Turn the node on or off.
    Power(bool),
    /// Set the RGB color, each channel 0..=0xFF.
    Color { red: u8, green: u8, blue: u8 },
    /// Color brightness, 0x0A..=0x64.
    ColorBrightness(u8),
    /// White temperature, 0..=0x7F.
    WhiteTemperature(u8),
    /// White brightness, 1..=0x7F.
    WhiteBrightness(u8),
    /// Preset color sequence, 0..=6.
    Preset(u8),
    /// How long each sequence color is shown, in milliseconds.
    SequenceColorDuration(u32),
    /// Fade duration between sequence colors, in milliseconds.
    SequenceFadeDuration(u32),
    /// Assign a new mesh id to the destination node.
    MeshAddress(MeshId),
    /// Ask the destination for a fresh status report.
    RequestStatus,
}

impl CommandKind {
    /// Wire opcode for this command.
    pub fn opcode(&self) -> u8 {
        match self {
            CommandKind::Power(_) => CMD_POWER,
            CommandKind::Color { .. } => CMD_COLOR,
            CommandKind::ColorBrightness(_) => CMD_COLOR_BRIGHTNESS,
            CommandKind::WhiteTemperature(_) => CMD_WHITE_TEMPERATURE,
            CommandKind::WhiteBrightness(_) => CMD_WHITE_BRIGHTNESS,
            CommandKind::Preset(_) => CMD_PRESET,
            CommandKind::SequenceColorDuration(_) => CMD_SEQUENCE_COLOR_DURATION,
            CommandKind::SequenceFadeDuration(_) => CMD_SEQUENCE_FADE_DURATION,
            CommandKind::MeshAddress(_) => CMD_MESH_ADDRESS,
            CommandKind::RequestStatus => CMD_STATUS_REQUEST,
        }
    }

    /// Wire data bytes for this command.
    pub fn data(&self) -> Vec<u8> {
        match self {
            CommandKind::Power(on) => vec![u8::from(*on)],
            CommandKind::Color { red, green, blue } => vec![0x04, *red, *green, *blue],
            CommandKind::ColorBrightness(value)
            | CommandKind::WhiteTemperature(value)
            | CommandKind::WhiteBrightness(value)
            | CommandKind::Preset(value) => vec![*value],
            CommandKind::SequenceColorDuration(millis)
            | CommandKind::SequenceFadeDuration(millis) => millis.to_le_bytes().to_vec(),
            CommandKind::MeshAddress(mesh_id) => mesh_id.0.to_le_bytes().to_vec(),
            CommandKind::RequestStatus => vec![0x10],
        }
    }
}

/// One queued unit of work for the scheduler worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub destination: MeshId,
    pub opcode: u8,
    pub data: Vec<u8>,
    pub with_response: bool,
    /// Best-effort commands (status polls) get a single attempt and their
    /// failure never propagates to the submitter.
    pub allow_to_fail: bool,
}

impl Command {
    /// A user-intent command: retried on failure, failure reported.
    pub fn new(destination: MeshId, kind: &CommandKind) -> Self {
        Self {
            destination,
            opcode: kind.opcode(),
            data: kind.data(),
            with_response: false,
            allow_to_fail: false,
        }
    }

    /// A best-effort command (one attempt, failures swallowed).
    pub fn best_effort(destination: MeshId, kind: &CommandKind) -> Self {
        Self {
            allow_to_fail: true,
            ..Self::new(destination, kind)
        }
    }

    /// A raw opcode/data command for operations outside [`CommandKind`].
    pub fn raw(destination: MeshId, opcode: u8, data: Vec<u8>) -> Self {
        Self {
            destination,
            opcode,
            data,
            with_response: false,
            allow_to_fail: false,
        }
    }
}

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The packet was written to the gateway.
    Delivered,
    /// A best-effort command failed; the caller is unaffected.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandKind};
    use lumen_core::MeshId;

    #[test]
    fn encodings_match_the_wire_protocol() {
        assert_eq!(CommandKind::Power(true).opcode(), 0xD0);
        assert_eq!(CommandKind::Power(true).data(), vec![0x01]);
        assert_eq!(CommandKind::Power(false).data(), vec![0x00]);

        let color = CommandKind::Color {
            red: 0x10,
            green: 0x20,
            blue: 0x30,
        };
        assert_eq!(color.opcode(), 0xE2);
        assert_eq!(color.data(), vec![0x04, 0x10, 0x20, 0x30]);

        assert_eq!(CommandKind::WhiteTemperature(0x7F).opcode(), 0xF0);
        assert_eq!(CommandKind::WhiteBrightness(0x45).opcode(), 0xF1);
        assert_eq!(CommandKind::ColorBrightness(0x40).opcode(), 0xF2);
        assert_eq!(CommandKind::Preset(3).data(), vec![3]);

        assert_eq!(
            CommandKind::SequenceColorDuration(0x0102_0304).data(),
            vec![0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(
            CommandKind::MeshAddress(MeshId(0x0107)).data(),
            vec![0x07, 0x01]
        );
        assert_eq!(CommandKind::RequestStatus.data(), vec![0x10]);
    }

    #[test]
    fn best_effort_flag_marks_polls() {
        let user = Command::new(MeshId(1), &CommandKind::Power(true));
        assert!(!user.allow_to_fail);
        let poll = Command::best_effort(MeshId::BROADCAST, &CommandKind::RequestStatus);
        assert!(poll.allow_to_fail);
        assert_eq!(poll.destination, MeshId::BROADCAST);
    }
}

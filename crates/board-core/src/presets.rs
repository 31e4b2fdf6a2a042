//! Named preset positions offered by the setup tool.

use crate::board::Board;

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    pub placement: &'static str,
}

impl Preset {
    pub fn board(&self) -> Option<Board> {
        Board::from_placement(self.placement).ok()
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "starting",
        description: "Standard starting layout",
        tags: &["opening", "standard"],
        placement: "rqkr/pppp/4/PPPP/RQKR",
    },
    Preset {
        name: "empty",
        description: "Empty board",
        tags: &["blank"],
        placement: "4/4/4/4/4",
    },
    Preset {
        name: "kings_only",
        description: "Bare kings in opposite corners",
        tags: &["endgame", "draw"],
        placement: "k3/4/4/4/3K",
    },
    Preset {
        name: "queen_check",
        description: "Black queen checks the white king along the file",
        tags: &["check", "tactics"],
        placement: "k3/4/2q1/4/2K1",
    },
    Preset {
        name: "back_rank_mate",
        description: "White rook mates on the back rank",
        tags: &["checkmate", "tactics"],
        placement: "k2R/pp2/4/4/3K",
    },
    Preset {
        name: "rook_endgame",
        description: "Rook against pawn",
        tags: &["endgame", "rook"],
        placement: "1k2/4/1p2/R3/2K1",
    },
];

pub fn preset(name: &str) -> Option<Board> {
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .and_then(Preset::board)
}

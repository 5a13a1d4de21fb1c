mod frames;
mod roster;

pub use frames::{DirectoryFrameSource, FrameSource, SyntheticFrameSource};
pub use roster::{
    load_roster, parse_roster, CharacterDef, CharacterRoster, RosterError, RosterErrorCode,
    SourceLocation,
};

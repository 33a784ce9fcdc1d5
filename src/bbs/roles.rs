/// Role / privilege level constants
use crate::storage::MessageBase;

pub const LEVEL_USER: u8 = 1;
pub const LEVEL_SYSOP: u8 = 10;

pub fn role_name(level: u8) -> &'static str {
    match level {
        LEVEL_SYSOP => "Sysop",
        _ => "User",
    }
}

/// Level granted to a caller once established; the configured sysop name is
/// matched exactly.
pub fn level_for(name: &str, sysop: &str) -> u8 {
    if name == sysop { LEVEL_SYSOP } else { LEVEL_USER }
}

pub fn can_read(level: u8, base: &MessageBase) -> bool {
    i64::from(level) >= base.access_read
}

pub fn can_post(level: u8, base: &MessageBase) -> bool {
    i64::from(level) >= base.access_post
}

/// The legacy transition-id mapping carried over from the event-stream
/// markers in the original implementation (SPEC_FULL §3 [ADD]). Not used by
/// this control plane directly; kept as a frozen lookup for a future
/// event-builder integration that needs the same numbering.
pub fn transition_id(transition: &str) -> Option<u8> {
    match transition {
        "reset" => Some(0),
        "plat" => Some(1),
        "alloc" => Some(2),
        "dealloc" => Some(3),
        "connect" => Some(4),
        "disconnect" => Some(5),
        "configure" => Some(6),
        "unconfigure" => Some(7),
        "beginrun" => Some(8),
        "endrun" => Some(9),
        "beginrecord" => Some(10),
        "endrecord" => Some(11),
        "enable" => Some(12),
        "disable" => Some(13),
        "configupdate" => Some(14),
        _ => None,
    }
}

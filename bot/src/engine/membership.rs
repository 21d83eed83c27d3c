/// A member's status as reported by the chat platform.
/// Updates carrying a status outside this set fail to decode and never
/// reach the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    /// Restricted members may or may not still be in the chat; see
    /// [`MemberPresence::is_member`].
    Restricted,
    Left,
    Kicked,
}

/// One observed membership snapshot: the status plus the platform's
/// "still in the chat" flag, which only matters for restricted members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberPresence {
    pub status: MemberStatus,
    pub is_member: bool,
}

impl MemberPresence {
    pub fn new(status: MemberStatus, is_member: bool) -> Self {
        Self { status, is_member }
    }

    /// Whether this snapshot describes someone currently taking part in the chat.
    pub fn is_participant(&self) -> bool {
        match self.status {
            MemberStatus::Owner | MemberStatus::Administrator | MemberStatus::Member => true,
            MemberStatus::Restricted => self.is_member,
            MemberStatus::Left | MemberStatus::Kicked => false,
        }
    }
}

/// The semantic change between two membership snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Joined,
    Left,
    NoOp,
}

/// Classify a membership update. Total and side-effect free.
///
/// An update that leaves the status unchanged is `NoOp`, even when the
/// presence flag of a restricted member flips.
pub fn classify(previous: MemberPresence, next: MemberPresence) -> Transition {
    if previous.status == next.status {
        return Transition::NoOp;
    }
    match (previous.is_participant(), next.is_participant()) {
        (false, true) => Transition::Joined,
        (true, false) => Transition::Left,
        _ => Transition::NoOp,
    }
}

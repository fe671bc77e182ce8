use serde::{Deserialize, Serialize};

use crate::trial::BlockKind;

/// Defines session phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;

    /// Phase suspends on an instruction screen until a continue signal.
    fn awaits_continue(&self) -> bool;

    fn block(&self) -> Option<BlockKind> {
        None
    }

    fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Welcome,
    Consent,
    Practice,
    SimpleBlock,
    Break,
    ComplexBlock,
    Completed,
    Submitted,
}

impl Phase for SessionPhase {
    fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Welcome => Consent,
            Consent => Practice,
            Practice => SimpleBlock,
            SimpleBlock => Break,
            Break => ComplexBlock,
            ComplexBlock => Completed,
            Completed => Submitted,
            Submitted => return None,
        })
    }

    fn awaits_continue(&self) -> bool {
        matches!(
            self,
            Self::Welcome
                | Self::Consent
                | Self::Practice
                | Self::SimpleBlock
                | Self::Break
                | Self::ComplexBlock
        )
    }

    fn block(&self) -> Option<BlockKind> {
        match self {
            Self::Practice => Some(BlockKind::Practice),
            Self::SimpleBlock => Some(BlockKind::Simple),
            Self::ComplexBlock => Some(BlockKind::Complex),
            _ => None,
        }
    }
}

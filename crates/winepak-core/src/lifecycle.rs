use crate::CoreError;

/// Pipeline state of the one active packaging cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Empty,
    AppSelected,
    Analyzed,
    Configured,
    ManifestGenerated,
    Building,
    Succeeded,
    Failed,
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildState::Empty => write!(f, "empty"),
            BuildState::AppSelected => write!(f, "selected"),
            BuildState::Analyzed => write!(f, "analyzed"),
            BuildState::Configured => write!(f, "configured"),
            BuildState::ManifestGenerated => write!(f, "generated"),
            BuildState::Building => write!(f, "building"),
            BuildState::Succeeded => write!(f, "succeeded"),
            BuildState::Failed => write!(f, "failed"),
        }
    }
}

pub fn validate_transition(from: BuildState, to: BuildState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        // Importing or re-selecting an app is legal whenever no build runs.
        (
            BuildState::Empty
                | BuildState::AppSelected
                | BuildState::Analyzed
                | BuildState::Configured
                | BuildState::ManifestGenerated
                | BuildState::Succeeded
                | BuildState::Failed,
            BuildState::AppSelected
        ) | (BuildState::AppSelected, BuildState::Analyzed)
            | (BuildState::Analyzed, BuildState::Configured)
            | (BuildState::Configured, BuildState::ManifestGenerated)
            | (BuildState::ManifestGenerated, BuildState::Building)
            | (
                BuildState::Building,
                BuildState::Succeeded | BuildState::Failed
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

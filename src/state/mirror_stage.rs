/// Stage definitions for one mirror operation
///
/// A mirror walks the stages strictly in order. `Failed` can be entered from
/// the stages that touch the network or the filesystem in a fatal way;
/// `DownloadingImages` never fails since broken images are skipped.
use std::fmt;

/// Represents the current stage of a mirror operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorStage {
    // ===== Active Stages =====
    /// Normalizing and checking the requested URL
    Validating,

    /// Downloading and parsing the page
    Fetching,

    /// Creating the host folder and its image sub-folder
    PreparingFolders,

    /// Collecting the image elements of the page
    ExtractingImages,

    /// Downloading images one by one (or concurrently)
    DownloadingImages,

    /// Applying local references to the document
    RewritingMarkup,

    /// Serializing the document to disk
    WritingOutput,

    // ===== Terminal Stages =====
    /// Page and images were saved
    Done,

    /// A fatal error ended the operation
    Failed,
}

impl MirrorStage {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if an error in this stage ends the operation
    pub fn can_fail(&self) -> bool {
        matches!(
            self,
            Self::Validating | Self::Fetching | Self::PreparingFolders | Self::WritingOutput
        )
    }

    /// The stage that follows this one on success
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Validating => Some(Self::Fetching),
            Self::Fetching => Some(Self::PreparingFolders),
            Self::PreparingFolders => Some(Self::ExtractingImages),
            Self::ExtractingImages => Some(Self::DownloadingImages),
            Self::DownloadingImages => Some(Self::RewritingMarkup),
            Self::RewritingMarkup => Some(Self::WritingOutput),
            Self::WritingOutput => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true if moving from this stage to `to` is allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        if to == Self::Failed {
            return self.can_fail();
        }
        self.next() == Some(to)
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::PreparingFolders => "preparing_folders",
            Self::ExtractingImages => "extracting_images",
            Self::DownloadingImages => "downloading_images",
            Self::RewritingMarkup => "rewriting_markup",
            Self::WritingOutput => "writing_output",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all stages in pipeline order
    pub fn all_stages() -> Vec<Self> {
        vec![
            Self::Validating,
            Self::Fetching,
            Self::PreparingFolders,
            Self::ExtractingImages,
            Self::DownloadingImages,
            Self::RewritingMarkup,
            Self::WritingOutput,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for MirrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

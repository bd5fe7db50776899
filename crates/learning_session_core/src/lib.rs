pub mod domain;
pub mod error;
pub mod journey;
pub mod lesson;
pub mod ports;
pub mod revisions;
pub mod session;
pub mod workspace;

pub use domain::{
    AnswerKey, AnswerRecord, ComparisonResult, LearningPreference, LearningSession, LessonContent,
    LessonRequest, PdfUpload, QuestionKind, QuizData, QuizStatus, RevisionEntry, Screen,
    SessionStatus,
};
pub use error::{JourneyError, Operation, SessionError, SessionResult};
pub use journey::JourneyService;
pub use ports::{
    AnswerCheckService, ContentGenerationService, ImageSearchService, JourneyGenerationService,
    JourneyPageStore, PortError, PortResult, QuizGenerationService, RevisionStore,
    SummaryComparisonService,
};
pub use revisions::{InMemoryRevisionStore, RevisionHistory};
pub use session::{Collaborators, SessionController};
pub use workspace::LearnerWorkspace;

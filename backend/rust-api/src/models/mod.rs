pub mod certificate;
pub mod progress;
pub mod question;
pub mod session;
pub mod user;

pub use certificate::{Certificate, CertificateSummary, VerifiedCertificate};
pub use progress::{CourseProgress, TopicProgress, TopicState, PASS_THRESHOLD, TOPIC_COUNT};
pub use question::{
    AnswerDetail, AnswerPair, EvaluationReport, Question, QuizQuestion, VerifyAnswersRequest,
};
pub use session::LoginSession;
pub use user::{AccountStatus, User, UserProfile, UserRole};

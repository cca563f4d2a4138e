pub mod job;

pub use job::{Application, ApplicationPatch, ApplicationStatus, JobPatch, JobPosting, JobStatus};

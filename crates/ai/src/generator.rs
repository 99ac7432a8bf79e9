use async_trait::async_trait;
use tracing::{debug, warn};

use crate::request::GenerationRequest;
use crate::result::AiError;
use crate::subject::{GeneratedSubject, usable};

/// The subject-generation collaborator (typically an LLM behind an HTTP API).
///
/// Only ever invoked after the student explicitly confirmed a readiness prompt.
#[async_trait]
pub trait SubjectGenerator: Send + Sync + 'static {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedSubject>, AiError>;
}

/// Run a generator and normalise its output.
///
/// Subjects without a title are dropped, the list is truncated to
/// `request.count`, and an empty result becomes [`AiError::EmptyResponse`].
pub async fn generate_checked<G>(
    generator: &G,
    request: &GenerationRequest,
) -> Result<Vec<GeneratedSubject>, AiError>
where
    G: SubjectGenerator + ?Sized,
{
    if request.count == 0 {
        return Err(AiError::InvalidInput("count must be >= 1".to_string()));
    }

    let raw = generator.generate(request).await?;
    let returned = raw.len();
    let mut subjects = usable(raw);
    if subjects.is_empty() {
        warn!(returned, "generator produced no usable subject");
        return Err(AiError::EmptyResponse);
    }
    subjects.truncate(request.count);
    debug!(returned, kept = subjects.len(), "generation normalised");
    Ok(subjects)
}

/// Deterministic offline generator.
///
/// Used when no model is configured: produces `count` template subjects built
/// from the request's domain, level and interests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

#[async_trait]
impl SubjectGenerator for TemplateGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedSubject>, AiError> {
        let focus = if request.interests.is_empty() {
            "recherche appliquée".to_string()
        } else {
            request.interests.join(", ")
        };

        Ok((1..=request.count)
            .map(|i| GeneratedSubject {
                title: format!(
                    "{} - Sujet {i} : application des technologies innovantes en {}",
                    request.domain, request.domain
                ),
                problem_statement: format!(
                    "Comment les avancées technologiques récentes peuvent-elles résoudre des problèmes concrets en {} au niveau {} ?",
                    request.domain, request.level
                ),
                keywords: format!(
                    "{}, {}, {}, innovation, {}",
                    request.domain, request.level, request.faculty, focus
                ),
                description: format!(
                    "Étude des applications possibles des technologies émergentes en {} autour de : {focus}.",
                    request.domain
                ),
                methodology: "Revue de littérature, analyse comparative, étude de cas, prototypage"
                    .to_string(),
                difficulty: "moyenne".to_string(),
                estimated_duration: "5-7 mois".to_string(),
            })
            .collect())
    }
}

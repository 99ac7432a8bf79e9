use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use topicforge_ai::SubjectGenerator;
use topicforge_conversation::ReadinessDetector;
use topicforge_core::{Clock, UserId};
use topicforge_recommendations::{
    InMemoryCatalog, RecommendationFetcher, RecommendationStore, RecordFetcher,
};

use crate::config::Settings;
use crate::controller::SessionController;

/// Builds the controller for a user's first request.
pub type ControllerFactory<F> = Box<dyn Fn(UserId) -> SessionController<F> + Send + Sync>;

/// One [`SessionController`] per user. Sessions share nothing mutable.
pub struct SessionRegistry<F: RecordFetcher = RecommendationFetcher> {
    sessions: RwLock<HashMap<UserId, Arc<SessionController<F>>>>,
    factory: ControllerFactory<F>,
}

impl<F: RecordFetcher> SessionRegistry<F> {
    pub fn new(factory: ControllerFactory<F>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// The user's controller, created on first use.
    pub fn session(&self, user_id: UserId) -> Arc<SessionController<F>> {
        if let Some(existing) = self.sessions.read().get(&user_id) {
            return Arc::clone(existing);
        }

        let mut sessions = self.sessions.write();
        let controller = sessions.entry(user_id).or_insert_with(|| {
            let controller = Arc::new((self.factory)(user_id));
            info!(
                user_id = %user_id,
                session_id = %controller.session_id(),
                "session started"
            );
            controller
        });
        Arc::clone(controller)
    }

    pub fn get(&self, user_id: UserId) -> Option<Arc<SessionController<F>>> {
        self.sessions.read().get(&user_id).cloned()
    }

    /// Drop the user's session. Returns whether one existed.
    pub fn end_session(&self, user_id: UserId) -> bool {
        let removed = self.sessions.write().remove(&user_id);
        if let Some(controller) = &removed {
            info!(
                user_id = %user_id,
                session_id = %controller.session_id(),
                "session ended"
            );
        }
        removed.is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionRegistry<RecommendationFetcher> {
    /// Registry whose sessions all read from one in-memory catalog.
    pub fn in_memory(
        catalog: Arc<InMemoryCatalog>,
        generator: Arc<dyn SubjectGenerator>,
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = settings.clone();
        Self::new(Box::new(move |user_id| {
            in_memory_controller(
                user_id,
                Arc::clone(&catalog),
                Arc::clone(&generator),
                &settings,
                Arc::clone(&clock),
            )
        }))
    }
}

/// A controller wired to an [`InMemoryCatalog`] for all three collaborators.
pub fn in_memory_controller(
    user_id: UserId,
    catalog: Arc<InMemoryCatalog>,
    generator: Arc<dyn SubjectGenerator>,
    settings: &Settings,
    clock: Arc<dyn Clock>,
) -> SessionController<RecommendationFetcher> {
    let fetcher = RecommendationFetcher::new(
        catalog.clone(),
        catalog.clone(),
        catalog.clone(),
        settings.recommendations.clone(),
    )
    .with_clock(Arc::clone(&clock));
    let store = RecommendationStore::new(fetcher).with_clock(Arc::clone(&clock));

    SessionController::new(
        user_id,
        store,
        ReadinessDetector::new(settings.readiness.clone()),
        generator,
        catalog,
    )
    .with_clock(clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topicforge_ai::TemplateGenerator;
    use topicforge_core::SystemClock;

    fn registry() -> SessionRegistry {
        SessionRegistry::in_memory(
            Arc::new(InMemoryCatalog::seeded()),
            Arc::new(TemplateGenerator),
            &Settings::default(),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn same_user_gets_same_session() {
        let registry = registry();
        let user = UserId::new();

        let a = registry.session(user);
        let b = registry.session(user);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn users_are_isolated() {
        let registry = registry();
        let alice = registry.session(UserId::new());
        let bob = registry.session(UserId::new());

        alice.send_message("Je veux développer une application").unwrap();

        assert_ne!(alice.session_id(), bob.session_id());
        assert_eq!(bob.conversation().turns().len(), 0);
    }

    #[test]
    fn ending_a_session_starts_fresh_next_time() {
        let registry = registry();
        let user = UserId::new();
        let first = registry.session(user);

        assert!(registry.end_session(user));
        assert!(!registry.end_session(user));
        assert!(registry.get(user).is_none());

        let second = registry.session(user);
        assert_ne!(first.session_id(), second.session_id());
    }
}

//! Headless state of the three-step try-on wizard: who is selected, what has
//! been generated, and where the user goes when a generation fails.

use serde::{Deserialize, Serialize};

use crate::{
    codec::ImageCodec,
    error::{Result, TryOnError},
    models::{HistoryItem, ImageItem},
    providers::ImageGenerationProvider,
};

pub const TRY_ON_FAILED_MESSAGE: &str =
    "Generation failed. Check your network connection or try different images.";
pub const GARMENT_FAILED_MESSAGE: &str =
    "Garment generation failed. Try a different description.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    #[default]
    Person = 1,
    Garment = 2,
    Result = 3,
}

#[derive(Debug, Clone, Default)]
pub struct TryOnSession {
    step: Step,
    people: Vec<ImageItem>,
    garments: Vec<ImageItem>,
    history: Vec<HistoryItem>,
    selected_person: Option<ImageItem>,
    selected_garment: Option<ImageItem>,
    result: Option<String>,
    error: Option<String>,
}

impl TryOnSession {
    pub fn new(people: Vec<ImageItem>, garments: Vec<ImageItem>) -> Self {
        Self {
            people,
            garments,
            ..Self::default()
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn people(&self) -> &[ImageItem] {
        &self.people
    }

    pub fn garments(&self) -> &[ImageItem] {
        &self.garments
    }

    /// Most recent first.
    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn selected_person(&self) -> Option<&ImageItem> {
        self.selected_person.as_ref()
    }

    pub fn selected_garment(&self) -> Option<&ImageItem> {
        self.selected_garment.as_ref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn add_person_upload(&mut self, url: impl Into<String>) -> &ImageItem {
        let item = ImageItem::uploaded(url);
        self.selected_person = Some(item.clone());
        self.people.insert(0, item);
        &self.people[0]
    }

    pub fn add_garment_upload(&mut self, url: impl Into<String>) -> &ImageItem {
        let item = ImageItem::uploaded(url);
        self.selected_garment = Some(item.clone());
        self.garments.insert(0, item);
        &self.garments[0]
    }

    pub fn select_person(&mut self, id: &str) -> Result<()> {
        let item = find(&self.people, id)?;
        self.selected_person = Some(item);
        Ok(())
    }

    pub fn select_garment(&mut self, id: &str) -> Result<()> {
        let item = find(&self.garments, id)?;
        self.selected_garment = Some(item);
        Ok(())
    }

    pub fn go_to(&mut self, step: Step) -> Result<()> {
        match step {
            Step::Garment if self.selected_person.is_none() => Err(TryOnError::ValidationError(
                "select a person before choosing a garment".into(),
            )),
            Step::Result if self.result.is_none() => Err(TryOnError::ValidationError(
                "no try-on result to show yet".into(),
            )),
            _ => {
                self.step = step;
                Ok(())
            }
        }
    }

    /// Generates a garment from text and selects it.
    pub async fn generate_garment(
        &mut self,
        provider: &dyn ImageGenerationProvider,
        prompt: &str,
    ) -> Result<&ImageItem> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(TryOnError::ValidationError("describe the garment first".into()));
        }

        self.error = None;
        match provider.generate_garment_image(prompt).await {
            Ok(data_uri) => {
                let item = ImageItem::generated(data_uri);
                self.selected_garment = Some(item.clone());
                self.garments.insert(0, item);
                Ok(&self.garments[0])
            }
            Err(err) => {
                log::error!("Garment generation via {} failed: {}", provider.name(), err);
                self.error = Some(GARMENT_FAILED_MESSAGE.to_string());
                Err(err)
            }
        }
    }

    /// Runs the try-on for the current selections. On failure the session
    /// returns to the garment step with its selections untouched.
    pub async fn generate_try_on(
        &mut self,
        provider: &dyn ImageGenerationProvider,
        codec: &ImageCodec,
    ) -> Result<&str> {
        let (person, garment) = match (&self.selected_person, &self.selected_garment) {
            (Some(person), Some(garment)) => (person.clone(), garment.clone()),
            _ => {
                return Err(TryOnError::ValidationError(
                    "select both a person and a garment".into(),
                ))
            }
        };

        self.error = None;
        self.step = Step::Result;

        match run_try_on(provider, codec, &person.url, &garment.url).await {
            Ok(result) => {
                self.history
                    .insert(0, HistoryItem::new(&person.url, &garment.url, &result));
                self.result = Some(result);
                Ok(self.result.as_deref().unwrap_or_default())
            }
            Err(err) => {
                log::error!("Try-on via {} failed: {}", provider.name(), err);
                self.error = Some(TRY_ON_FAILED_MESSAGE.to_string());
                self.step = Step::Garment;
                Err(err)
            }
        }
    }

    /// Starts over; collections and history survive.
    pub fn reset(&mut self) {
        self.step = Step::Person;
        self.selected_person = None;
        self.selected_garment = None;
        self.result = None;
        self.error = None;
    }
}

async fn run_try_on(
    provider: &dyn ImageGenerationProvider,
    codec: &ImageCodec,
    person_ref: &str,
    garment_ref: &str,
) -> Result<String> {
    let person = codec.to_base64_payload(person_ref).await?;
    let garment = codec.to_base64_payload(garment_ref).await?;
    provider.generate_try_on_image(&person, &garment).await
}

fn find(items: &[ImageItem], id: &str) -> Result<ImageItem> {
    items
        .iter()
        .find(|item| item.id == id)
        .cloned()
        .ok_or_else(|| TryOnError::ValidationError(format!("unknown image: {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Behaviour {
        Succeed(&'static str),
        TimeOut,
    }

    struct FakeProvider {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                calls: AtomicUsize::new(0),
            }
        }

        fn answer(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed(uri) => Ok(uri.to_string()),
                Behaviour::TimeOut => Err(TryOnError::TimeoutError {
                    provider: "fake".into(),
                    seconds: 120,
                }),
            }
        }
    }

    #[async_trait]
    impl ImageGenerationProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate_garment_image(&self, _prompt: &str) -> Result<String> {
            self.answer()
        }

        async fn generate_try_on_image(&self, person: &str, garment: &str) -> Result<String> {
            assert!(!person.starts_with("data:"));
            assert!(!garment.starts_with("data:"));
            self.answer()
        }
    }

    fn codec() -> ImageCodec {
        ImageCodec::new(reqwest::Client::new(), Duration::from_secs(1))
    }

    fn session() -> TryOnSession {
        TryOnSession::new(
            vec![ImageItem::preset("p1", "data:image/png;base64,UDE=")],
            vec![ImageItem::preset("g1", "data:image/png;base64,RzE=")],
        )
    }

    #[tokio::test]
    async fn timeout_returns_to_garment_step_and_keeps_selections() {
        let mut session = session();
        session.select_person("p1").unwrap();
        session.go_to(Step::Garment).unwrap();
        session.select_garment("g1").unwrap();

        let provider = FakeProvider::new(Behaviour::TimeOut);
        let err = session.generate_try_on(&provider, &codec()).await.unwrap_err();

        assert!(matches!(err, TryOnError::TimeoutError { .. }));
        assert_eq!(session.step(), Step::Garment);
        assert_eq!(session.selected_person().unwrap().id, "p1");
        assert_eq!(session.selected_garment().unwrap().id, "g1");
        assert_eq!(session.error(), Some(TRY_ON_FAILED_MESSAGE));
        assert!(session.result().is_none());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn successful_try_on_is_logged_most_recent_first() {
        let mut session = session();
        session.select_person("p1").unwrap();
        session.select_garment("g1").unwrap();

        let first = FakeProvider::new(Behaviour::Succeed("data:image/jpeg;base64,T05F"));
        session.generate_try_on(&first, &codec()).await.unwrap();
        assert_eq!(session.step(), Step::Result);

        session.add_garment_upload("data:image/png;base64,RzI=");
        let second = FakeProvider::new(Behaviour::Succeed("data:image/jpeg;base64,VFdP"));
        let result = session.generate_try_on(&second, &codec()).await.unwrap();
        assert_eq!(result, "data:image/jpeg;base64,VFdP");

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].result_image, "data:image/jpeg;base64,VFdP");
        assert_eq!(history[0].garment_image, "data:image/png;base64,RzI=");
        assert_eq!(history[1].result_image, "data:image/jpeg;base64,T05F");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn try_on_requires_both_selections() {
        let mut session = session();
        session.select_person("p1").unwrap();
        let provider = FakeProvider::new(Behaviour::Succeed("data:image/png;base64,AA=="));

        let err = session.generate_try_on(&provider, &codec()).await.unwrap_err();
        assert!(matches!(err, TryOnError::ValidationError(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.step(), Step::Person);
    }

    #[tokio::test]
    async fn generated_garment_is_prepended_and_selected() {
        let mut session = session();
        let provider = FakeProvider::new(Behaviour::Succeed("data:image/png;base64,R0VO"));

        let item = session
            .generate_garment(&provider, "a yellow raincoat")
            .await
            .unwrap()
            .clone();

        assert!(item.is_generated);
        assert!(item.id.starts_with("gen-"));
        assert_eq!(session.garments()[0], item);
        assert_eq!(session.selected_garment(), Some(&item));
        assert_eq!(session.garments().len(), 2);
    }

    #[tokio::test]
    async fn blank_garment_prompt_is_rejected_locally() {
        let mut session = session();
        let provider = FakeProvider::new(Behaviour::Succeed("data:image/png;base64,R0VO"));
        assert!(session.generate_garment(&provider, "   ").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn navigation_guards_and_reset() {
        let mut session = session();
        assert!(session.go_to(Step::Garment).is_err());
        assert!(session.go_to(Step::Result).is_err());

        let upload_id = session
            .add_person_upload("https://example.com/me.jpg")
            .id
            .clone();
        assert_eq!(session.people()[0].id, upload_id);
        assert_eq!(session.selected_person().unwrap().id, upload_id);
        session.go_to(Step::Garment).unwrap();

        session.reset();
        assert_eq!(session.step(), Step::Person);
        assert!(session.selected_person().is_none());
        assert_eq!(session.people().len(), 2);
        assert!(session.select_person("missing").is_err());
    }
}

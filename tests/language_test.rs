//! Comprehensive unit tests for language detection and translation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailsift::error::{PipelineError, Result};
use mailsift::language::{
    GoogleTranslateBackend, LanguageDetector, LibreTranslateBackend, TranslationService,
    Translator, WhatlangDetector,
};
use mailsift::normalize::TextNormalizer;
use mailsift::{DetectedLanguage, NormalizedText, RawMessage};
use mockall::mock;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    pub Provider {}

    #[async_trait]
    impl Translator for Provider {
        async fn translate(&self, text: &str, source_lang: &str) -> Result<String>;
        fn name(&self) -> &'static str;
        fn max_chars(&self) -> Option<usize>;
    }
}

fn provider(name: &'static str) -> MockProvider {
    let mut mock = MockProvider::new();
    mock.expect_name().return_const(name);
    mock.expect_max_chars().return_const(None);
    mock
}

fn service(backends: Vec<MockProvider>) -> TranslationService {
    let backends: Vec<Arc<dyn Translator>> = backends
        .into_iter()
        .map(|b| Arc::new(b) as Arc<dyn Translator>)
        .collect();
    TranslationService::new(backends, Duration::from_secs(5))
}

fn text(s: &str) -> NormalizedText {
    TextNormalizer::keeping_punctuation()
        .expect("Failed to create normalizer")
        .normalize(&RawMessage::from(s))
}

#[test]
fn test_detects_french() {
    let detector = WhatlangDetector::default();
    let language = detector.detect(&text(
        "Bonjour à tous, je voudrais réserver une table pour quatre personnes ce soir",
    ));
    assert_eq!(language.code(), "fr");
}

#[test]
fn test_short_text_defaults_to_english() {
    let detector = WhatlangDetector::default();
    assert!(detector.detect(&text("ok")).is_english());
    assert!(detector.detect(&text("")).is_english());
    assert!(detector.detect(&text("12345 !!!")).is_english());
}

#[test]
fn test_short_english_spam_stays_english() {
    let detector = WhatlangDetector::default();
    for message in [
        "Win cash today",
        "Click here to claim your free prize now",
        "I WON A FREE PRIZE!!! Click here now",
    ] {
        let language = detector.detect(&text(message));
        assert!(language.is_english(), "{message:?} detected as {}", language.code());
    }
}

#[test]
fn test_unreliable_hits_pass_when_not_required() {
    let strict = WhatlangDetector::default();
    let lenient = WhatlangDetector::default().requiring_reliable(false);
    let message = text("Win cash today");

    assert!(strict.detect(&message).is_english());
    let info = whatlang::detect(message.as_str()).expect("Failed to detect");
    if !info.is_reliable() && info.confidence() >= 0.1 && info.lang() != whatlang::Lang::Eng {
        assert!(!lenient.detect(&message).is_english());
    }
}

#[tokio::test]
async fn test_english_is_never_sent_to_a_provider() {
    let mut mock = MockProvider::new();
    mock.expect_translate().never();
    let service = service(vec![mock]);

    let translated = service
        .translate(&text("hello there"), &DetectedLanguage::english())
        .await
        .expect("Failed to pass English through");
    assert_eq!(translated.as_str(), "hello there");
    assert!(!translated.was_translated());
}

#[tokio::test]
async fn test_falls_back_to_next_provider() {
    let mut first = provider("first");
    first
        .expect_translate()
        .times(1)
        .returning(|_, lang| Err(PipelineError::translation(lang, "quota exceeded")));
    let mut second = provider("second");
    second
        .expect_translate()
        .times(1)
        .returning(|_, _| Ok("Good evening".to_string()));

    let translated = service(vec![first, second])
        .translate(&text("Bonsoir"), &DetectedLanguage::new("fr"))
        .await
        .expect("Failed to translate");
    assert_eq!(translated.as_str(), "Good evening");
    assert!(translated.was_translated());
}

#[tokio::test]
async fn test_first_success_wins() {
    let mut first = provider("first");
    first
        .expect_translate()
        .times(1)
        .returning(|_, _| Ok("Hi".to_string()));
    let mut second = provider("second");
    second.expect_translate().never();

    let translated = service(vec![first, second])
        .translate(&text("Hola"), &DetectedLanguage::new("es"))
        .await
        .expect("Failed to translate");
    assert_eq!(translated.as_str(), "Hi");
}

#[tokio::test]
async fn test_all_providers_failing_is_a_translation_failure() {
    let mut first = provider("first");
    first
        .expect_translate()
        .returning(|_, lang| Err(PipelineError::translation(lang, "down")));
    let mut second = provider("second");
    second
        .expect_translate()
        .returning(|_, _| Ok("   ".to_string()));

    let err = service(vec![first, second])
        .translate(&text("Guten Tag"), &DetectedLanguage::new("de"))
        .await
        .expect_err("Translation should fail");
    match err {
        PipelineError::Translation { source_lang, reason } => {
            assert_eq!(source_lang, "de");
            assert!(reason.contains("first"));
            assert!(reason.contains("second"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_no_providers_is_a_translation_failure() {
    let err = service(Vec::new())
        .translate(&text("Ciao"), &DetectedLanguage::new("it"))
        .await
        .expect_err("Translation should fail");
    assert_eq!(err.kind(), "TranslationFailure");
}

#[tokio::test]
async fn test_long_text_is_chunked() {
    let mut chunked = MockProvider::new();
    chunked.expect_name().return_const("chunked");
    chunked.expect_max_chars().return_const(Some(10));
    chunked
        .expect_translate()
        .times(2)
        .returning(|chunk, _| Ok(chunk.to_uppercase()));

    let translated = service(vec![chunked])
        .translate(&text("uno dos. tres"), &DetectedLanguage::new("es"))
        .await
        .expect("Failed to translate");
    assert_eq!(translated.as_str(), "UNO DOS. TRES");
}

#[tokio::test]
async fn test_google_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("sl", "fr"))
        .and(query_param("tl", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [["Hello ", "Bonjour ", null, null, 1], ["world", "le monde", null, null, 1]],
            null,
            "fr"
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GoogleTranslateBackend::new(server.uri());
    let translated = backend
        .translate("Bonjour le monde", "fr")
        .await
        .expect("Failed to translate");
    assert_eq!(translated, "Hello world");
}

#[tokio::test]
async fn test_libretranslate_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(body_partial_json(serde_json::json!({
            "q": "Hola",
            "source": "es",
            "target": "en",
            "api_key": "secret"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translatedText": "Hello" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = LibreTranslateBackend::new(server.uri(), Some("secret".to_string()));
    let translated = backend.translate("Hola", "es").await.expect("Failed to translate");
    assert_eq!(translated, "Hello");
}

#[tokio::test]
async fn test_provider_error_status_falls_through() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;
    let working = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translatedText": "Thanks" })),
        )
        .mount(&working)
        .await;

    let backends: Vec<Arc<dyn Translator>> = vec![
        Arc::new(GoogleTranslateBackend::new(broken.uri())),
        Arc::new(LibreTranslateBackend::new(working.uri(), None)),
    ];
    let service = TranslationService::new(backends, Duration::from_secs(5));
    assert_eq!(service.provider_names(), vec!["google", "libretranslate"]);

    let translated = service
        .translate(&text("Danke"), &DetectedLanguage::new("de"))
        .await
        .expect("Failed to translate");
    assert_eq!(translated.as_str(), "Thanks");
}

/*!
 * # subtrans - ASS/SSA subtitle translation service
 *
 * A Rust library for translating the dialogue of ASS/SSA subtitle files with
 * a text-generation model, served over HTTP or run from the command line.
 *
 * ## Features
 *
 * - Translate only the `Dialogue:` lines; headers, styles and timings pass through
 * - Translate using Google Gemini or a local Ollama model
 * - Batch dialogue lines into bounded requests, with rate-limit aware retries
 * - Fall back to the original text of a batch instead of failing a file
 * - Multi-file uploads delivered as a one-shot zip archive
 * - Per-job progress over server-sent events
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Line-level model of an ASS/SSA document
 * - `translation`: Batching, translation and reassembly:
 *   - `translation::batch`: Splitting dialogue into batches
 *   - `translation::core`: One batch against the provider
 *   - `translation::formatting`: Line-break sentinels and response cleanup
 *   - `translation::retry`: Retry policy for provider calls
 *   - `translation::reassembly`: Writing translations back into the document
 * - `providers`: Text-generation backends:
 *   - `providers::gemini`: Gemini generateContent client
 *   - `providers::ollama`: Ollama API client
 *   - `providers::mock`: Scriptable in-process provider
 * - `progress`: Progress events, sinks and per-job channels
 * - `app_controller`: Job orchestration over files
 * - `server`: HTTP routes
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod progress;
pub mod providers;
pub mod server;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, JobFile, JobReport};
pub use errors::{AppError, ProviderError, SubtitleError};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use progress::{ProgressEvent, ProgressHub, ProgressSink};
pub use subtitle_processor::{DialogueLine, SubtitleDocument, SubtitleLine};
pub use translation::TranslationService;

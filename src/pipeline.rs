//! Collaborator traits and the conversation turn driver
//!
//! Transcription, response generation, and speech synthesis run outside
//! this crate; the conversation loop only depends on the traits below.

use tracing::{debug, info};

use crate::audio::listen::{ListenResult, Listener};
use crate::audio::playback::{PlaybackBackend, PlaybackStreamer, SynthesisChunk};
use crate::audio::source::CaptureBackend;
use crate::audio::Utterance;
use crate::error::Result;
use crate::stop::StopSignal;

/// Consumes a finished utterance and produces text, if any was heard.
pub trait Transcriber {
    fn transcribe(&mut self, utterance: &Utterance) -> Result<Option<String>>;
}

/// Produces reply text for the user's words.
pub trait ResponseGenerator {
    fn respond(&mut self, user_text: &str) -> Result<String>;
}

/// Produces synthesized speech for a reply.
///
/// Chunks are delivered in playback order and must all share one sample
/// rate; voice selection is the collaborator's concern.
pub trait Synthesizer {
    fn synthesize(&mut self, text: &str) -> Result<Vec<SynthesisChunk>>;
}

/// Outcome of one conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    /// Heard the user and spoke a reply
    Reply { user_text: String, reply: String },
    /// Captured audio contained no recognizable speech
    NothingHeard,
    /// The stop signal ended the turn
    Stopped,
}

/// Drives one listen → transcribe → respond → speak turn
pub struct Conversation<T, R, S> {
    transcriber: T,
    responder: R,
    synthesizer: S,
}

impl<T, R, S> Conversation<T, R, S>
where
    T: Transcriber,
    R: ResponseGenerator,
    S: Synthesizer,
{
    pub fn new(transcriber: T, responder: R, synthesizer: S) -> Self {
        Self {
            transcriber,
            responder,
            synthesizer,
        }
    }

    /// Run a single turn. Cancelled or empty captures short-circuit
    /// without touching the collaborators.
    pub fn turn<CB, PB>(
        &mut self,
        listener: &Listener,
        capture: &mut CB,
        playback: &mut PlaybackStreamer<PB>,
        stop: &StopSignal,
    ) -> Result<TurnResult>
    where
        CB: CaptureBackend,
        PB: PlaybackBackend,
    {
        let utterance = match listener.listen(capture, stop)? {
            ListenResult::Utterance(utterance) => utterance,
            ListenResult::NoSpeech => return Ok(TurnResult::NothingHeard),
            ListenResult::Cancelled => return Ok(TurnResult::Stopped),
        };

        debug!("Transcribing {:.1}s of audio", utterance.duration_secs());
        let Some(user_text) = self.transcriber.transcribe(&utterance)? else {
            debug!("No speech recognized in the captured audio");
            return Ok(TurnResult::NothingHeard);
        };
        info!("Heard: \"{}\"", user_text);

        let reply = self.responder.respond(&user_text)?;
        info!("Reply: \"{}\"", reply);

        let chunks = self.synthesizer.synthesize(&reply)?;
        let report = playback.play(chunks)?;
        if !report.completed {
            debug!("Playback ended early after {} chunks", report.chunks_written);
        }

        Ok(TurnResult::Reply { user_text, reply })
    }
}

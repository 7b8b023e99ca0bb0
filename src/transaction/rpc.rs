use crate::callback::CallBack;
use crate::error::GatewayError;
use crate::transaction::process::GitProcess;
use crate::transaction::{BodyEncoding, Transaction};
use bytes::{Bytes, BytesMut};
use flate2::write::GzDecoder;
use std::fmt::Display;
use std::io::{ErrorKind, Write};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

const CHUNK: usize = 32 * 1024;

impl Transaction {
    /// Runs one stateless-rpc round trip.
    ///
    /// The request body is fed into git's stdin while git's stdout is relayed to
    /// the response; both copies are polled together, because git may answer
    /// before it has read all of its input and sequential copying would stall on
    /// full pipe buffers.
    pub async fn service_rpc<S, E>(
        self,
        process: GitProcess,
        body: S,
        encoding: BodyEncoding,
        call_back: CallBack,
    ) where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let GitProcess {
            child,
            stdin,
            stdout,
            stderr,
        } = process;
        let work = async {
            let stdin = stdin.ok_or(GatewayError::MissingPipe("stdin"))?;
            let (fed, sent) = tokio::try_join!(
                feed_stdin(body, stdin, encoding),
                relay_stdout(stdout, &call_back)
            )?;
            debug!(request_bytes = fed, response_bytes = sent, "git exchange relayed");
            Ok(())
        };
        self.run_to_exit(child, stderr, work).await;
    }
}

/// Copies the request body into git's stdin, inflating it first for gzip bodies.
///
/// stdin is closed when the body ends so git sees end of input. Only a failing
/// request payload is reported as an error; decompression failures and git
/// closing its stdin early end the copy and are logged.
pub async fn feed_stdin<S, E>(
    mut body: S,
    mut stdin: ChildStdin,
    encoding: BodyEncoding,
) -> Result<u64, GatewayError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut inflater = match encoding {
        BodyEncoding::Gzip => Some(Inflater::new()),
        BodyEncoding::Identity => None,
    };
    let mut written = 0u64;
    while let Some(next) = body.next().await {
        let chunk = next.map_err(|e| GatewayError::Payload(e.to_string()))?;
        let Some(gzip) = inflater.as_mut() else {
            if !write_stdin(&mut stdin, &chunk).await {
                return Ok(written);
            }
            written += chunk.len() as u64;
            continue;
        };
        for input in chunk.chunks(INFLATE_STEP) {
            let data = match gzip.step(input) {
                Ok(data) => data,
                Err(err) => {
                    warn!(error = %err, "dropping request body");
                    return Ok(written);
                }
            };
            if !write_stdin(&mut stdin, &data).await {
                return Ok(written);
            }
            written += data.len() as u64;
        }
    }
    if let Some(inflater) = inflater {
        match inflater.finish() {
            Ok(rest) => {
                if !write_stdin(&mut stdin, &rest).await {
                    return Ok(written);
                }
                written += rest.len() as u64;
            }
            Err(err) => warn!(error = %err, "truncated request body"),
        }
    }
    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "closing git stdin");
    }
    Ok(written)
}

/// Input bytes handed to the decoder per step. Deflate expands at most about
/// 1032:1, so one step buffers roughly 1 MiB of output at most.
const INFLATE_STEP: usize = 1024;

/// Streaming gzip decoder whose output is drained after every step.
struct Inflater {
    decoder: GzDecoder<Vec<u8>>,
}

impl Inflater {
    fn new() -> Self {
        Self {
            decoder: GzDecoder::new(Vec::new()),
        }
    }

    /// Inflates at most [`INFLATE_STEP`] bytes of input.
    fn step(&mut self, input: &[u8]) -> Result<Bytes, GatewayError> {
        self.decoder
            .write_all(input)
            .map_err(|e| GatewayError::Decompression(e.to_string()))?;
        Ok(Bytes::from(std::mem::take(self.decoder.get_mut())))
    }

    fn finish(self) -> Result<Vec<u8>, GatewayError> {
        self.decoder
            .finish()
            .map_err(|e| GatewayError::Decompression(e.to_string()))
    }
}

async fn write_stdin(stdin: &mut ChildStdin, data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    match stdin.write_all(data).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("git closed its stdin before the request body ended");
            false
        }
        Err(e) => {
            warn!(error = %e, "failed to write request body to git");
            false
        }
    }
}

/// Relays git's stdout to the response as it is produced.
pub async fn relay_stdout(mut stdout: ChildStdout, call_back: &CallBack) -> Result<u64, GatewayError> {
    let mut sent = 0u64;
    let mut buf = BytesMut::with_capacity(CHUNK);
    loop {
        buf.reserve(CHUNK);
        let n = stdout.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(sent);
        }
        sent += n as u64;
        call_back.send(buf.split().freeze()).await?;
    }
}

//! TCP client session management.

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};

use crate::error::ClientError;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

/// Whether `line` ends the session on the server side.
pub fn is_quit_command(line: &str) -> bool {
    let line = line.trim();
    QUIT_COMMANDS
        .iter()
        .any(|command| line.eq_ignore_ascii_case(command))
}

/// Copy everything from `reader` to `out` until the server closes the stream.
///
/// Bytes are forwarded unchanged, so prompts without a trailing newline
/// show up immediately.
pub async fn print_incoming<R, W>(mut reader: R, mut out: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        out.write_all(&buf[..n]).await?;
        out.flush().await?;
    }
}

/// Send each input line to `writer`, newline-terminated.
///
/// Stops after a quit command or when the input side goes away, then
/// shuts the write half down.
pub async fn relay_input<W>(
    mut input: mpsc::UnboundedReceiver<String>,
    mut writer: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = input.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        if is_quit_command(&line) {
            break;
        }
    }
    writer.shutdown().await
}

/// Run one client session against `address`.
pub async fn run_client_session(address: &str) -> Result<(), ClientError> {
    let stream = TcpStream::connect(address)
        .await
        .map_err(|source| ClientError::Connect {
            address: address.to_string(),
            source,
        })?;
    tracing::info!("Connected to chat server at {}", address);
    println!("Type /quit or /exit to leave. Press Ctrl+D to disconnect.\n");

    let (reader, writer) = stream.into_split();

    let mut read_task = tokio::spawn(print_incoming(reader, tokio::io::stdout()));

    // Create channel for rustyline input
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline("") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str()).ok();
                    }
                    let quit = is_quit_command(&line);
                    if input_tx.send(line).is_err() || quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let mut write_task = tokio::spawn(relay_input(input_rx, writer));

    // The server closes the connection after /quit or our EOF, so the read
    // side decides when the session is over.
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            finish(read_result)
        }
        write_result = &mut write_task => {
            if let Err(e) = finish(write_result) {
                read_task.abort();
                return Err(e);
            }
            finish(read_task.await)
        }
    }
}

fn finish(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ClientError> {
    match result {
        Ok(Ok(())) => {
            tracing::info!("Session ended");
            Ok(())
        }
        Ok(Err(e)) => Err(ClientError::ConnectionLost(e)),
        Err(e) => Err(ClientError::ConnectionLost(std::io::Error::other(e))),
    }
}

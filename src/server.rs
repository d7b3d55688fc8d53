use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, field, info, instrument, warn};

use crate::codec::FrameCodec;
use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::{Config, ConfigStore};
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;

    info!(
        dir = %config.dir,
        dbfilename = %config.dbfilename,
        "Redis server listening on {}",
        listener.local_addr()?
    );

    serve(listener, Store::new(), &config).await
}

/// Accepts connections forever, handling each one on its own task. All connections share `store`
/// and the parameters derived from `config`.
pub async fn serve(listener: TcpListener, store: Store, config: &Config) -> Result<(), Error> {
    let params = config.params();
    let max_frame_size = config.max_frame_size;

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        let params = params.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            let codec = FrameCodec::new(max_frame_size);
            if let Err(e) = handle_connection(socket, client_address, codec, store, params).await
            {
                error!(error = %e, "Connection terminated");
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, client_address, codec, store, params),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    codec: FrameCodec,
    store: Store,
    params: ConfigStore,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, codec);

    tracing::Span::current()
        .record("connection_id", field::display(conn.id))
        .record("client_address", field::display(client_address));

    // A decoding error ends the loop through `?`: once framing is lost the rest of the stream
    // can't be trusted, so the connection is dropped.
    while let Some(frame) = conn.read_frame().await? {
        debug!("Received frame from client: {}", frame);

        let res = match Command::try_from(frame) {
            Ok(cmd) => cmd.exec(&store, &params),
            Err(e) => {
                warn!(error = ?e, "Rejected command");
                Frame::from(e)
            }
        };

        debug!("Sending response to client: {}", res);
        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}

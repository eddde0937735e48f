//! Gateway Module Tests
//!
//! ## Test Scopes
//! - **Command parsing**: syntax, arity and class checks shared with the CLI.
//! - **End to end**: raw protocol exchanges against an in-process cluster, including
//!   degraded clusters with a Store node down.

#[cfg(test)]
mod tests {
    use crate::error::FsError;
    use crate::framing::{
        Status, read_listing, read_sized, read_status, read_text, read_text_opt, write_size,
        write_sized, write_status, write_text,
    };
    use crate::gateway::{
        CommandRequest, DELETE_COMPLETE, DOWNLOAD_COMPLETE, TAR_COMPLETE, UPLOAD_COMPLETE,
    };
    use crate::paths::ROOT_TOKEN;
    use crate::routing::FileClass;
    use crate::testing::TestCluster;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    fn parse(line: &str) -> Result<CommandRequest, FsError> {
        CommandRequest::parse(line, ROOT_TOKEN)
    }

    // ============================================================
    // COMMAND PARSING
    // ============================================================

    #[test]
    fn test_parse_valid_commands() {
        assert_eq!(
            parse("uploadf a.c b.txt ~S1/dest").unwrap(),
            CommandRequest::Upload {
                files: vec!["a.c".to_string(), "b.txt".to_string()],
                destination: "~S1/dest".to_string(),
            }
        );
        assert_eq!(
            parse("  downlf   ~S1/x.pdf ~S1/y.c ").unwrap(),
            CommandRequest::Download {
                paths: vec!["~S1/x.pdf".to_string(), "~S1/y.c".to_string()],
            }
        );
        assert_eq!(
            parse("downltar .txt").unwrap(),
            CommandRequest::Archive {
                class: FileClass::Text
            }
        );
        assert_eq!(
            parse("dispfnames ~S1").unwrap(),
            CommandRequest::List {
                path: "~S1".to_string()
            }
        );
        assert_eq!(parse("quit").unwrap(), CommandRequest::Quit);
    }

    #[test]
    fn test_parse_enforces_arity() {
        for line in [
            "uploadf ~S1/dest",
            "uploadf a.c b.c c.c d.c ~S1/dest",
            "downlf",
            "removef ~S1/a.c ~S1/b.c ~S1/c.c",
            "downltar",
            "downltar .c .pdf",
            "dispfnames",
            "dispfnames ~S1 ~S1/x",
            "quit now",
        ] {
            assert!(
                matches!(parse(line), Err(FsError::Validation(_))),
                "{:?} should be refused",
                line
            );
        }
    }

    #[test]
    fn test_parse_rejects_unsupported_types_and_roots() {
        assert!(matches!(parse("uploadf a.png ~S1/x"), Err(FsError::Validation(_))));
        assert!(matches!(parse("removef ~S1/Makefile"), Err(FsError::Validation(_))));
        assert!(matches!(parse("uploadf a.c /tmp/dest"), Err(FsError::Validation(_))));
        assert!(matches!(parse("dispfnames /home"), Err(FsError::Validation(_))));
        assert!(matches!(parse("downltar .zip"), Err(FsError::Validation(_))));
        assert!(matches!(parse("downltar pdf"), Err(FsError::Validation(_))));
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert!(matches!(
            parse("rename a.c b.c"),
            Err(FsError::UnknownCommand(ref w)) if w == "rename"
        ));
        assert!(matches!(parse("   "), Err(FsError::Protocol(_))));
    }

    #[test]
    fn test_display_is_canonical_command_line() {
        let request = parse("uploadf  a.c   docs/b.txt  ~S1/d").unwrap();
        assert_eq!(request.to_string(), "uploadf a.c docs/b.txt ~S1/d");
        assert_eq!(parse(&request.to_string()).unwrap(), request);
        assert_eq!(
            parse("downltar .pdf").unwrap().to_string(),
            "downltar .pdf"
        );
    }

    // ============================================================
    // END TO END
    // ============================================================

    async fn connect(cluster: &TestCluster) -> TcpStream {
        TcpStream::connect(cluster.gateway_addr).await.unwrap()
    }

    async fn command(stream: &mut TcpStream, line: &str) -> Status {
        write_text(stream, line).await.unwrap();
        read_status(stream).await.unwrap()
    }

    async fn upload(
        stream: &mut TcpStream,
        files: &[(&str, &[u8])],
        destination: &str,
    ) -> Vec<Status> {
        let names: Vec<&str> = files.iter().map(|(name, _)| *name).collect();
        let line = format!("uploadf {} {}", names.join(" "), destination);
        assert_eq!(command(stream, &line).await, Status::Ok);

        let mut acks = Vec::new();
        for (_, data) in files {
            write_sized(stream, data).await.unwrap();
            acks.push(read_status(stream).await.unwrap());
        }
        assert_eq!(read_text(stream).await.unwrap(), UPLOAD_COMPLETE);
        acks
    }

    /// Reads one per-item download result.
    async fn item(stream: &mut TcpStream) -> Result<Vec<u8>, Status> {
        match read_status(stream).await.unwrap() {
            Status::Ok => Ok(read_sized(stream, u64::MAX).await.unwrap()),
            status => Err(status),
        }
    }

    #[tokio::test]
    async fn test_upload_routes_each_file_by_class() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;

        let acks = upload(
            &mut client,
            &[("a.c", &b"int main;"[..]), ("b.txt", &b"notes"[..])],
            "~S1/dest",
        )
        .await;

        assert_eq!(acks, vec![Status::Ok, Status::Ok]);
        assert_eq!(
            std::fs::read(cluster.home(FileClass::SourceCode).join("dest/a.c")).unwrap(),
            b"int main;"
        );
        assert_eq!(
            std::fs::read(cluster.home(FileClass::Text).join("dest/b.txt")).unwrap(),
            b"notes"
        );
        assert!(!cluster.home(FileClass::SourceCode).join("dest/b.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_uses_basename_of_local_path() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;

        upload(&mut client, &[("src/parser/lex.c", &b"x"[..])], "~S1/p").await;

        assert!(cluster.home(FileClass::SourceCode).join("p/lex.c").exists());
    }

    #[tokio::test]
    async fn test_download_round_trip_and_per_item_errors() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;
        let report: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
        let files = [("r.pdf", report.as_slice()), ("empty.c", &b""[..])];
        upload(&mut client, &files, "~S1/d").await;

        assert_eq!(
            command(&mut client, "downlf ~S1/d/r.pdf ~S1/d/missing.txt").await,
            Status::Ok
        );
        assert_eq!(item(&mut client).await.unwrap(), report);
        let missing = item(&mut client).await.unwrap_err();
        assert_eq!(missing, Status::error("NotFound"));
        assert_eq!(read_text(&mut client).await.unwrap(), DOWNLOAD_COMPLETE);

        assert_eq!(command(&mut client, "downlf ~S1/d/empty.c").await, Status::Ok);
        assert_eq!(item(&mut client).await.unwrap(), b"");
        assert_eq!(read_text(&mut client).await.unwrap(), DOWNLOAD_COMPLETE);

        // The owning node keeps the file after a fetch.
        assert!(cluster.home(FileClass::Document).join("d/r.pdf").exists());
    }

    #[tokio::test]
    async fn test_remove_twice_is_safe() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;
        upload(&mut client, &[("a.zip", &b"PK"[..]), ("b.zip", &b"PK"[..])], "~S1/z").await;

        assert_eq!(command(&mut client, "removef ~S1/z/a.zip").await, Status::Ok);
        assert_eq!(read_status(&mut client).await.unwrap(), Status::Ok);
        assert_eq!(read_text(&mut client).await.unwrap(), DELETE_COMPLETE);

        assert_eq!(command(&mut client, "removef ~S1/z/a.zip").await, Status::Ok);
        assert_eq!(read_status(&mut client).await.unwrap(), Status::error("NotFound"));
        assert_eq!(read_text(&mut client).await.unwrap(), DELETE_COMPLETE);

        assert!(!cluster.home(FileClass::Archive).join("z/a.zip").exists());
        assert!(cluster.home(FileClass::Archive).join("z/b.zip").exists());
    }

    #[tokio::test]
    async fn test_listing_is_grouped_by_class() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;

        assert_eq!(command(&mut client, "dispfnames ~S1/l").await, Status::Ok);
        assert_eq!(read_listing(&mut client).await.unwrap(), "");

        let first = [("z.zip", &b"1"[..]), ("b.txt", &b"2"[..]), ("a.pdf", &b"3"[..])];
        let second = [("y.c", &b"4"[..]), ("a.txt", &b"5"[..]), ("x.c", &b"6"[..])];
        upload(&mut client, &first, "~S1/l").await;
        upload(&mut client, &second, "~S1/l").await;

        assert_eq!(command(&mut client, "dispfnames ~S1/l").await, Status::Ok);
        assert_eq!(
            read_listing(&mut client).await.unwrap(),
            "x.c\ny.c\na.pdf\na.txt\nb.txt\nz.zip\n"
        );
    }

    #[tokio::test]
    async fn test_listing_skips_unreachable_node() {
        let cluster = TestCluster::start_without(&[FileClass::Text]).await;
        let mut client = connect(&cluster).await;
        let files = [("m.c", &b"1"[..]), ("n.txt", &b"2"[..]), ("o.pdf", &b"3"[..])];
        upload(&mut client, &files, "~S1").await;

        assert_eq!(command(&mut client, "dispfnames ~S1").await, Status::Ok);
        assert_eq!(read_listing(&mut client).await.unwrap(), "m.c\no.pdf\n");
    }

    #[tokio::test]
    async fn test_archive_of_source_code() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;
        let files = [("main.c", &b"int main;"[..]), ("lib.c", &b"int lib;"[..])];
        upload(&mut client, &files, "~S1/src").await;

        assert_eq!(command(&mut client, "downltar .c").await, Status::Ok);
        let bytes = item(&mut client).await.unwrap();
        assert_eq!(read_text(&mut client).await.unwrap(), TAR_COMPLETE);

        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["src/lib.c", "src/main.c"]);
    }

    #[tokio::test]
    async fn test_archive_with_document_node_down_fails_cleanly() {
        let cluster = TestCluster::start_without(&[FileClass::Document]).await;
        let mut client = connect(&cluster).await;

        let exchange = async {
            assert_eq!(command(&mut client, "downltar .pdf").await, Status::Ok);
            let status = read_status(&mut client).await.unwrap();
            let marker = read_text(&mut client).await.unwrap();
            (status, marker)
        };
        let (status, marker) = tokio::time::timeout(Duration::from_secs(10), exchange)
            .await
            .expect("gateway hung on an unreachable node");

        assert_eq!(status, Status::error("PeerUnreachable"));
        assert_eq!(marker, TAR_COMPLETE);

        // The session is still usable.
        assert_eq!(command(&mut client, "dispfnames ~S1").await, Status::Ok);
        assert_eq!(read_listing(&mut client).await.unwrap(), "");
    }

    /// A Store node that answers one download with `OK`, announces 100 bytes,
    /// sends 10 and hangs up.
    async fn spawn_truncating_node() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            assert_eq!(read_text(&mut stream).await.unwrap(), "DOWNLOAD");
            read_text(&mut stream).await.unwrap();
            write_status(&mut stream, &Status::Ok).await.unwrap();
            write_size(&mut stream, 100).await.unwrap();
            stream.write_all(&[1u8; 10]).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_truncated_store_transfer_fails_only_that_item() {
        let node = spawn_truncating_node().await;
        let cluster = TestCluster::start_with_node(FileClass::Document, node).await;
        let mut client = connect(&cluster).await;
        upload(&mut client, &[("ok.c", &b"fine"[..])], "~S1").await;

        assert_eq!(command(&mut client, "downlf ~S1/cut.pdf ~S1/ok.c").await, Status::Ok);
        assert_eq!(
            item(&mut client).await.unwrap_err(),
            Status::error("TruncatedTransfer")
        );
        assert_eq!(item(&mut client).await.unwrap(), b"fine");
        assert_eq!(read_text(&mut client).await.unwrap(), DOWNLOAD_COMPLETE);

        // The session is still usable.
        assert_eq!(command(&mut client, "dispfnames ~S1").await, Status::Ok);
        assert_eq!(read_listing(&mut client).await.unwrap(), "ok.c\n");
    }

    #[tokio::test]
    async fn test_remove_with_text_node_down_reports_per_item() {
        let cluster = TestCluster::start_without(&[FileClass::Text]).await;
        let mut client = connect(&cluster).await;
        upload(&mut client, &[("keep.c", &b"x"[..])], "~S1").await;

        assert_eq!(command(&mut client, "removef ~S1/n.txt ~S1/keep.c").await, Status::Ok);
        assert_eq!(
            read_status(&mut client).await.unwrap(),
            Status::error("PeerUnreachable")
        );
        assert_eq!(read_status(&mut client).await.unwrap(), Status::Ok);
        assert_eq!(read_text(&mut client).await.unwrap(), DELETE_COMPLETE);

        assert!(!cluster.home(FileClass::SourceCode).join("keep.c").exists());
    }

    #[tokio::test]
    async fn test_refused_commands_keep_session_open() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;

        assert_eq!(
            command(&mut client, "frobnicate a.c").await,
            Status::error("UNKNOWN_COMMAND")
        );
        assert!(matches!(
            command(&mut client, "uploadf a.png ~S1/x").await,
            Status::Error(reason) if reason.starts_with("ValidationError")
        ));
        assert!(matches!(
            command(&mut client, "downltar .zip").await,
            Status::Error(reason) if reason.starts_with("ValidationError")
        ));

        assert_eq!(command(&mut client, "dispfnames ~S1").await, Status::Ok);
        assert_eq!(read_listing(&mut client).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_quit_closes_without_reply() {
        let cluster = TestCluster::start().await;
        let mut client = connect(&cluster).await;

        write_text(&mut client, "quit").await.unwrap();

        assert!(read_text_opt(&mut client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_upload_independently() {
        let cluster = TestCluster::start().await;
        let mut first = connect(&cluster).await;
        let mut second = connect(&cluster).await;
        let big = vec![7u8; 256 * 1024];
        let small = vec![9u8; 10];

        let one = [("one.zip", big.as_slice())];
        let two = [("two.zip", small.as_slice())];

        let (a, b) = tokio::join!(
            upload(&mut first, &one, "~S1/c"),
            upload(&mut second, &two, "~S1/c"),
        );

        assert_eq!(a, vec![Status::Ok]);
        assert_eq!(b, vec![Status::Ok]);
        let home = cluster.home(FileClass::Archive);
        assert_eq!(std::fs::read(home.join("c/one.zip")).unwrap(), big);
        assert_eq!(std::fs::read(home.join("c/two.zip")).unwrap(), small);
    }
}

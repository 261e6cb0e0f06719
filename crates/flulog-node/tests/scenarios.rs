//! End-to-end scenarios exercising a FLU through its public handle.

use bytes::Bytes;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use flulog_common::types::{Epoch, Lpn};
use flulog_node::{
    BadRequest, FillReply, Flu, FluConfig, ReadReply, SealReply, TrimReply, WriteReply,
};

fn config(dir: &std::path::Path) -> FluConfig {
    FluConfig::new(dir).with_page_size(8).with_max_mem(64 * 1024 * 1024)
}

fn page(bytes: &'static [u8; 8]) -> Bytes {
    Bytes::from_static(bytes)
}

#[tokio::test]
async fn seal_then_fenced_write() {
    let tmp = TempDir::new().unwrap();
    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    assert_eq!(
        flu.seal(Epoch::new(1)).await.unwrap(),
        SealReply::Sealed(Lpn::new(0))
    );

    assert_eq!(
        flu.write(Epoch::new(1), Lpn::new(1), page(b"ABCDEFGH"))
            .await
            .unwrap(),
        WriteReply::BadEpoch
    );
    assert_eq!(
        flu.write(Epoch::new(2), Lpn::new(1), page(b"ABCDEFGH"))
            .await
            .unwrap(),
        WriteReply::Written
    );
    assert_eq!(
        flu.read(Epoch::new(2), Lpn::new(1)).await.unwrap(),
        ReadReply::Page(Bytes::from_static(b"ABCDEFGH"))
    );

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn write_once_preserves_first_payload() {
    let tmp = TempDir::new().unwrap();
    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    let epoch = Epoch::new(1);
    let lpn = Lpn::new(5);

    assert_eq!(
        flu.write(epoch, lpn, page(b"xxxxxxxx")).await.unwrap(),
        WriteReply::Written
    );
    assert_eq!(
        flu.write(epoch, lpn, page(b"yyyyyyyy")).await.unwrap(),
        WriteReply::Overwritten
    );
    assert_eq!(
        flu.read(epoch, lpn).await.unwrap(),
        ReadReply::Page(Bytes::from_static(b"xxxxxxxx"))
    );

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn trimmed_page_is_final() {
    let tmp = TempDir::new().unwrap();
    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    let epoch = Epoch::new(1);
    let lpn = Lpn::new(7);

    assert_eq!(
        flu.write(epoch, lpn, page(b"zzzzzzzz")).await.unwrap(),
        WriteReply::Written
    );
    assert_eq!(flu.trim(epoch, lpn).await.unwrap(), TrimReply::Done);
    assert_eq!(flu.read(epoch, lpn).await.unwrap(), ReadReply::Trimmed);
    assert_eq!(
        flu.write(epoch, lpn, page(b"qqqqqqqq")).await.unwrap(),
        WriteReply::Overwritten
    );

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn fill_plugs_holes() {
    let tmp = TempDir::new().unwrap();
    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    let epoch = Epoch::new(1);
    let lpn = Lpn::new(9);

    assert_eq!(flu.fill(epoch, lpn).await.unwrap(), FillReply::Done);
    assert_eq!(flu.read(epoch, lpn).await.unwrap(), ReadReply::Trimmed);
    assert_eq!(flu.fill(epoch, lpn).await.unwrap(), FillReply::AlreadyTrimmed);

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn restart_reports_recovered_tail() {
    let tmp = TempDir::new().unwrap();
    let epoch = Epoch::new(1);

    {
        let flu = Flu::spawn(config(tmp.path())).await.unwrap();
        assert_eq!(
            flu.write(epoch, Lpn::new(3), page(b"aaaaaaaa")).await.unwrap(),
            WriteReply::Written
        );
        flu.stop().await.unwrap();
    }

    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    let status = flu.status().await.unwrap();
    assert_eq!(status.max_logical_page, Lpn::new(3));

    assert_eq!(
        flu.seal(Epoch::new(1)).await.unwrap(),
        SealReply::Sealed(Lpn::new(3))
    );
    assert_eq!(flu.status().await.unwrap().min_epoch, Epoch::new(2));

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn bad_requests_change_nothing() {
    let tmp = TempDir::new().unwrap();
    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    assert_eq!(
        flu.write(Epoch::new(1), Lpn::new(0), page(b"ABCDEFGH"))
            .await
            .unwrap(),
        WriteReply::BadRequest(BadRequest::ReservedLpn)
    );
    assert_eq!(
        flu.write(Epoch::new(1), Lpn::new(2), Bytes::from_static(b"short"))
            .await
            .unwrap(),
        WriteReply::BadRequest(BadRequest::PayloadSize {
            expected: 8,
            actual: 5
        })
    );

    let status = flu.status().await.unwrap();
    assert_eq!(status.max_logical_page, Lpn::new(0));
    assert_eq!(
        flu.read(Epoch::new(1), Lpn::new(2)).await.unwrap(),
        ReadReply::Unwritten
    );

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn full_state_identical_across_restart() {
    let tmp = TempDir::new().unwrap();
    let epoch = Epoch::new(3);

    let mut rng = rand::rngs::StdRng::seed_from_u64(0xF1u64);
    let payloads: Vec<Vec<u8>> = (0..20).map(|_| (0..8).map(|_| rng.gen()).collect()).collect();

    let before = {
        let flu = Flu::spawn(config(tmp.path())).await.unwrap();
        for (i, payload) in payloads.iter().enumerate() {
            let lpn = Lpn::new(i as u64 + 1);
            assert_eq!(
                flu.write(epoch, lpn, Bytes::from(payload.clone())).await.unwrap(),
                WriteReply::Written
            );
        }
        flu.trim(epoch, Lpn::new(4)).await.unwrap();
        flu.fill(epoch, Lpn::new(33)).await.unwrap();

        let status = flu.status().await.unwrap();
        flu.stop().await.unwrap();
        status
    };

    let flu = Flu::spawn(config(tmp.path())).await.unwrap();
    let after = flu.status().await.unwrap();
    assert_eq!(after, before);

    for (i, payload) in payloads.iter().enumerate() {
        let lpn = Lpn::new(i as u64 + 1);
        let expected = if lpn == Lpn::new(4) {
            ReadReply::Trimmed
        } else {
            ReadReply::Page(Bytes::from(payload.clone()))
        };
        assert_eq!(flu.read(epoch, lpn).await.unwrap(), expected);
    }
    assert_eq!(flu.read(epoch, Lpn::new(33)).await.unwrap(), ReadReply::Trimmed);

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn torn_write_reads_as_unwritten_after_restart() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path());
    let epoch = Epoch::new(1);
    let lpn = Lpn::new(2);

    {
        let flu = Flu::spawn(cfg.clone()).await.unwrap();
        assert_eq!(
            flu.write(epoch, lpn, page(b"fragile!")).await.unwrap(),
            WriteReply::Written
        );
        flu.stop().await.unwrap();
    }

    // Simulate a crash mid-write: drop the slot's tail-marker.
    let memfile = cfg.memfile_path();
    let slot_end = cfg.slot_offset(lpn) + cfg.slot_size();
    let file = std::fs::OpenOptions::new().write(true).open(&memfile).unwrap();
    file.set_len(slot_end - 1).unwrap();
    drop(file);

    let flu = Flu::spawn(cfg).await.unwrap();
    assert_eq!(flu.read(epoch, lpn).await.unwrap(), ReadReply::Unwritten);

    flu.stop().await.unwrap();
}

#[tokio::test]
async fn epoch_fence_survives_many_seals() {
    let tmp = TempDir::new().unwrap();
    let flu = Flu::spawn(config(tmp.path())).await.unwrap();

    for e in 1..=5u64 {
        // Each round: write at the current epoch, then seal it away.
        let epoch = Epoch::new(e);
        assert_eq!(
            flu.write(epoch, Lpn::new(e), Bytes::from(e.to_be_bytes().to_vec()))
                .await
                .unwrap(),
            WriteReply::Written
        );
        assert_eq!(
            flu.seal(epoch).await.unwrap(),
            SealReply::Sealed(Lpn::new(e))
        );
        assert_eq!(
            flu.write(epoch, Lpn::new(e + 10), page(b"toolate!"))
                .await
                .unwrap(),
            WriteReply::BadEpoch
        );
    }

    let status = flu.status().await.unwrap();
    assert_eq!(status.min_epoch, Epoch::new(6));
    assert_eq!(status.max_logical_page, Lpn::new(5));

    flu.stop().await.unwrap();
}

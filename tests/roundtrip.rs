//! End-to-end signature → delta → patch properties.

use std::num::NonZeroU32;

use engine::SignatureLoader;
use signature::SignatureHandle;
use transfer::{DeltaStream, SignatureStream, SyncOptions, apply_delta, load_signature};

async fn signature_of(data: &[u8], options: SyncOptions) -> Vec<u8> {
    SignatureStream::from_reader(
        std::io::Cursor::new(data.to_vec()),
        Some(data.len() as u64),
        options,
    )
    .collect()
    .await
    .expect("signature generation succeeds")
}

async fn delta_of(handle: &SignatureHandle, new_data: &[u8], options: SyncOptions) -> Vec<u8> {
    DeltaStream::from_reader(std::io::Cursor::new(new_data.to_vec()), handle, options)
        .collect()
        .await
        .expect("delta generation succeeds")
}

async fn round_trip(basis: &[u8], new_data: &[u8], options: SyncOptions) -> Vec<u8> {
    let sig_bytes = signature_of(basis, options).await;
    let handle = load_signature(&sig_bytes).expect("signature loads");
    let delta = delta_of(&handle, new_data, options).await;
    let mut rebuilt = Vec::new();
    apply_delta(&delta, basis, &mut rebuilt, options)
        .await
        .expect("patch application succeeds");
    rebuilt
}

#[tokio::test]
async fn text_content_round_trips() {
    let basis = b"line one\nline two\nline three\nline four\n".repeat(50);
    let mut new_data = basis.clone();
    new_data.extend_from_slice(b"line five, appended\n");
    new_data[10] = b'!';
    assert_eq!(round_trip(&basis, &new_data, SyncOptions::default()).await, new_data);
}

#[tokio::test]
async fn binary_content_with_nul_and_non_utf8_round_trips() {
    let basis: Vec<u8> = (0..8192u32).map(|v| (v * 131 % 256) as u8).collect();
    let mut new_data = vec![0u8; 512];
    new_data.extend_from_slice(&basis);
    new_data.extend_from_slice(&[0xff, 0xfe, 0x00, 0x80, 0xc3]);
    assert_eq!(round_trip(&basis, &new_data, SyncOptions::default()).await, new_data);
}

#[tokio::test]
async fn heavily_edited_content_round_trips() {
    let basis: Vec<u8> = (0..20_000u32).map(|v| (v % 253) as u8).collect();
    let mut new_data = basis.clone();
    new_data.rotate_left(4321);
    new_data.splice(100..200, std::iter::repeat_n(0u8, 500));
    new_data.truncate(18_000);
    let options = SyncOptions::default().with_buffer_size(1024);
    assert_eq!(round_trip(&basis, &new_data, options).await, new_data);
}

#[tokio::test]
async fn disjoint_content_round_trips() {
    let basis = vec![1u8; 4096];
    let new_data = vec![2u8; 4096];
    assert_eq!(round_trip(&basis, &new_data, SyncOptions::default()).await, new_data);
}

#[tokio::test]
async fn empty_inputs_round_trip() {
    assert_eq!(round_trip(b"", b"", SyncOptions::default()).await, b"");
    let new_data = b"created from nothing".to_vec();
    assert_eq!(
        round_trip(b"", &new_data, SyncOptions::default()).await,
        new_data
    );
    assert_eq!(round_trip(b"shrunk away", b"", SyncOptions::default()).await, b"");
}

#[tokio::test]
async fn identity_delta_is_strictly_smaller() {
    let line = b"the same line repeated to build redundant structure\n";
    for size in [4 * 1024usize, 64 * 1024, 256 * 1024] {
        let data: Vec<u8> = line.iter().copied().cycle().take(size).collect();
        let sig_bytes = signature_of(&data, SyncOptions::default()).await;
        let handle = load_signature(&sig_bytes).expect("signature loads");
        let delta = delta_of(&handle, &data, SyncOptions::default()).await;
        assert!(
            delta.len() < data.len(),
            "{size}-byte identity delta took {} bytes",
            delta.len()
        );
    }
}

#[tokio::test]
async fn streaming_delta_equals_buffered_delta() {
    let basis: Vec<u8> = (0..30_000u32).map(|v| (v * 37 % 256) as u8).collect();
    let mut new_data = basis.clone();
    new_data[15_000] ^= 0xaa;

    let options = SyncOptions::default().with_buffer_size(2048);
    let sig_bytes = signature_of(&basis, options).await;
    let handle = load_signature(&sig_bytes).expect("signature loads");

    let buffered = delta_of(&handle, &new_data, options).await;

    let mut lazy = DeltaStream::from_reader(
        std::io::Cursor::new(new_data.clone()),
        &handle,
        options,
    );
    let mut streamed = Vec::new();
    while let Some(chunk) = lazy.next_chunk().await {
        let chunk = chunk.expect("chunk ok");
        assert!(!chunk.is_empty(), "chunks are never empty");
        streamed.extend_from_slice(&chunk);
    }
    assert_eq!(streamed, buffered);
}

#[tokio::test]
async fn signature_loading_is_chunking_invariant() {
    let basis: Vec<u8> = (0..10_000u32).map(|v| (v * 11 % 256) as u8).collect();
    let new_data: Vec<u8> = basis.iter().rev().copied().chain(basis.iter().copied()).collect();
    let options = SyncOptions::default().with_block_length(NonZeroU32::new(256).unwrap());
    let sig_bytes = signature_of(&basis, options).await;

    let whole = load_signature(&sig_bytes).expect("single-chunk load");
    let reference_delta = delta_of(&whole, &new_data, options).await;

    for chunk_size in [1usize, 5, 19, 64, 4096] {
        let mut loader = SignatureLoader::new();
        for piece in sig_bytes.chunks(chunk_size) {
            loader.push(piece).expect("push succeeds");
        }
        let handle = SignatureHandle::new(loader.finish().expect("chunked load"));
        let delta = delta_of(&handle, &new_data, options).await;
        assert_eq!(delta, reference_delta, "chunk size {chunk_size}");
    }
}

#[tokio::test]
async fn pinned_parameters_round_trip() {
    let basis: Vec<u8> = (0..5000u32).map(|v| (v * 3 % 256) as u8).collect();
    let mut new_data = basis.clone();
    new_data.extend_from_slice(&basis[..777]);
    let options = SyncOptions::default()
        .with_block_length(NonZeroU32::new(128).unwrap())
        .with_strong_length(std::num::NonZeroU8::new(8).unwrap())
        .with_format(signature::SignatureFormat::Md4);
    assert_eq!(round_trip(&basis, &new_data, options).await, new_data);
}

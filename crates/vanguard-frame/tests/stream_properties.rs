use bytes::Bytes;
use proptest::prelude::*;
use vanguard_frame::{
    decode_all, DecodeEvent, Encoder, Location, Message, Payload, PhotoData, Ping, ProgramResult,
    ProgramUpload, StartPhotoData, StreamDecoder, Telemetry,
};

fn location() -> impl Strategy<Value = Location> {
    (
        -90.0f64..90.0,
        -180.0f64..180.0,
        -500.0f32..40_000.0,
        any::<u8>(),
        any::<u8>(),
        0.0f32..400.0,
    )
        .prop_map(|(lat, lon, alt, quality, satellites, speed)| Location {
            lat,
            lon,
            alt,
            quality,
            satellites,
            speed,
        })
}

fn telemetry() -> impl Strategy<Value = Telemetry> {
    (
        any::<u32>(),
        0u8..4,
        any::<u8>(),
        any::<u16>(),
        -60.0f32..80.0,
        0.0f32..100.0,
        -60.0f32..80.0,
    )
        .prop_map(
            |(uptime, mode, cpu, free_mem, int_temp, int_humidity, ext_temp)| Telemetry {
                uptime,
                mode,
                cpu,
                free_mem,
                int_temp,
                int_humidity,
                ext_temp,
            },
        )
}

fn payload() -> impl Strategy<Value = Payload> {
    let sub = (any::<u16>(), any::<u16>(), any::<u16>());
    prop_oneof![
        location().prop_map(Payload::Location),
        telemetry().prop_map(Payload::Telemetry),
        any::<u32>().prop_map(|magic| Payload::Ping(Ping { magic })),
        any::<u32>().prop_map(|magic| Payload::Pong(Ping { magic })),
        any::<u16>().prop_map(|index| Payload::StartPhotoData(StartPhotoData { index })),
        Just(Payload::StopPhotoData),
        (sub.clone(), any::<u32>(), prop::collection::vec(any::<u8>(), 0..=245)).prop_map(
            |((index, chunk, count), size, data)| {
                Payload::PhotoData(PhotoData::new(index, chunk, count, size, data))
            }
        ),
        (sub.clone(), "[a-z_.]{0,16}", prop::collection::vec(any::<u8>(), 0..200)).prop_map(
            |((index, chunk, count), name, data)| {
                Payload::ProgramUpload(ProgramUpload::new(index, chunk, count, name, data))
            }
        ),
        (
            sub,
            any::<i8>(),
            "[a-z_.]{0,16}",
            prop::collection::vec(any::<u8>(), 0..200)
        )
            .prop_map(|((index, chunk, count), exit, name, data)| {
                Payload::ProgramResult(ProgramResult::new(index, chunk, count, exit, name, data))
            }),
    ]
}

fn not_marker() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("no marker byte", |b| *b != 0xA3)
}

fn encode_all(payloads: &[Payload], timestamp: u32) -> Vec<u8> {
    let encoder = Encoder::with_timestamp(timestamp);
    payloads
        .iter()
        .flat_map(|p| encoder.encode(p).unwrap().to_vec())
        .collect()
}

fn payloads_of(messages: &[Message]) -> Vec<Payload> {
    messages.iter().map(|m| m.payload.clone()).collect()
}

proptest! {
    #[test]
    fn any_split_yields_the_same_messages(
        payloads in prop::collection::vec(payload(), 1..8),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let wire = encode_all(&payloads, 1_700_000_000);

        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(wire.len() + 1)).collect();
        points.sort_unstable();

        let mut decoder = StreamDecoder::new();
        let mut messages: Vec<Message> = Vec::new();
        let mut start = 0;
        for point in points.into_iter().chain(std::iter::once(wire.len())) {
            decoder.feed(&wire[start..point], &mut messages);
            start = point;
        }

        prop_assert_eq!(payloads_of(&messages), payloads);
        prop_assert!(decoder.pending_noise().is_empty());
        prop_assert!(!decoder.in_frame());
    }

    #[test]
    fn noise_between_frames_is_skipped(
        payloads in prop::collection::vec(payload(), 1..6),
        noise in prop::collection::vec(
            prop::collection::vec(not_marker(), 0..32),
            6,
        ),
    ) {
        let encoder = Encoder::with_timestamp(42);
        let mut wire = Vec::new();
        let mut noise_total = 0u64;
        for (payload, junk) in payloads.iter().zip(&noise) {
            wire.extend_from_slice(junk);
            noise_total += junk.len() as u64;
            wire.extend_from_slice(&encoder.encode(payload).unwrap());
        }

        let mut events: Vec<DecodeEvent> = Vec::new();
        let mut decoder = StreamDecoder::new();
        decoder.feed(&wire, &mut events);

        let messages: Vec<Payload> = events
            .iter()
            .filter_map(|e| match e {
                DecodeEvent::Message(m) => Some(m.payload.clone()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(messages, payloads);
        prop_assert!(!events.iter().any(|e| matches!(e, DecodeEvent::Malformed(_))));
        prop_assert_eq!(decoder.stats().noise_bytes, noise_total);
    }

    #[test]
    fn encoded_frames_carry_valid_checksums(payload in payload(), timestamp in any::<u32>()) {
        let frame = Encoder::with_timestamp(timestamp).encode(&payload).unwrap();
        let messages = decode_all(&frame);

        prop_assert_eq!(messages.len(), 1);
        prop_assert_eq!(messages[0].header.timestamp, timestamp);
        prop_assert_eq!(messages[0].header.data_length as usize + 14, frame.len());
        prop_assert!(messages[0].verify_checksum().is_ok());
    }

    #[test]
    fn arbitrary_bytes_never_panic(chunks in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..64),
        0..16,
    )) {
        let mut decoder = StreamDecoder::new();
        let mut messages: Vec<Message> = Vec::new();
        for chunk in &chunks {
            decoder.feed(chunk, &mut messages);
        }
        let trailing: Bytes = decoder.take_noise();

        let fed: usize = chunks.iter().map(Vec::len).sum();
        prop_assert!(decoder.stats().noise_bytes as usize <= fed);
        prop_assert!(trailing.len() <= fed);
        prop_assert_eq!(decoder.stats().messages as usize, messages.len());
    }
}

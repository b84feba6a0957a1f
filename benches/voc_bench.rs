//! Vocal 性能基准测试.
//!
//! 覆盖 VOC 封装、解封装与 seek 的核心路径.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vocal::codec::{CodecId, Packet};
use vocal::core::{ChannelLayout, Rational, VocalError};
use vocal::format::{
    Demuxer, IoContext, Muxer, SeekFlags, VocDemuxOptions, VocDemuxer, VocMuxer,
    io::MemoryBackend, stream::Stream,
};

/// 创建 PCM U8 音频流描述
fn make_stream(sample_rate: u32, channels: u32) -> Stream {
    let mut stream = Stream::new_audio(0);
    stream.codec_id = CodecId::PcmU8;
    stream.time_base = Rational::new(1, sample_rate as i32);
    if let Some(audio) = stream.audio_mut() {
        audio.sample_rate = sample_rate;
        audio.channel_layout = ChannelLayout::from_channels(channels);
        audio.sample_format = CodecId::PcmU8.sample_format();
    }
    stream
}

/// 封装到内存, 返回 VOC 文件字节
fn mux_to_memory(data: &[u8], chunk: usize, channels: u32) -> Vec<u8> {
    let mut io = IoContext::new(Box::new(MemoryBackend::new()));
    let mut muxer = VocMuxer::new();
    muxer
        .write_header(&mut io, &[make_stream(22050, channels)])
        .unwrap();
    for part in data.chunks(chunk) {
        muxer
            .write_packet(&mut io, &Packet::from_data(part.to_vec()))
            .unwrap();
    }
    muxer.write_trailer(&mut io).unwrap();
    io.seek(std::io::SeekFrom::Start(0)).unwrap();
    let size = io.size().unwrap() as usize;
    io.read_bytes(size).unwrap()
}

fn pcm_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// 读取全部数据包, 返回总字节数
fn demux_all(file: &[u8], options: VocDemuxOptions) -> usize {
    let mut io = IoContext::new(Box::new(MemoryBackend::from_data(file.to_vec())));
    let mut demuxer = VocDemuxer::with_options(options);
    demuxer.open(&mut io).unwrap();
    let mut total = 0;
    loop {
        match demuxer.read_packet(&mut io) {
            Ok(pkt) => total += pkt.size(),
            Err(VocalError::Eof) => break,
            Err(e) => panic!("读取数据包失败: {e}"),
        }
    }
    total
}

fn bench_voc_mux(c: &mut Criterion) {
    let data = pcm_data(1 << 20);
    c.bench_function("voc_mux_1mb_4096", |b| {
        b.iter(|| mux_to_memory(black_box(&data), 4096, 1));
    });
}

fn bench_voc_demux(c: &mut Criterion) {
    let data = pcm_data(1 << 20);
    let mono = mux_to_memory(&data, 4096, 1);
    let stereo = mux_to_memory(&data, 4096, 2);

    c.bench_function("voc_demux_1mb_default", |b| {
        b.iter(|| demux_all(black_box(&mono), VocDemuxOptions::default()));
    });
    c.bench_function("voc_demux_1mb_stereo", |b| {
        b.iter(|| demux_all(black_box(&stereo), VocDemuxOptions::default()));
    });
    c.bench_function("voc_demux_1mb_max_256", |b| {
        let options = VocDemuxOptions {
            max_packet_size: 256,
            ..Default::default()
        };
        b.iter(|| demux_all(black_box(&mono), options));
    });
}

fn bench_voc_seek(c: &mut Criterion) {
    let data = pcm_data(1 << 20);
    let file = mux_to_memory(&data, 4096, 1);

    c.bench_function("voc_seek_forward_scan", |b| {
        b.iter(|| {
            let mut io = IoContext::new(Box::new(MemoryBackend::from_data(file.clone())));
            let mut demuxer = VocDemuxer::with_options(VocDemuxOptions::default());
            demuxer.open(&mut io).unwrap();
            // 建立第一个索引条目后向前扫描到接近末尾的位置
            demuxer.read_packet(&mut io).unwrap();
            demuxer
                .seek(&mut io, 0, black_box(900_000), SeekFlags::default())
                .unwrap();
            demuxer.read_packet(&mut io).unwrap()
        });
    });
}

criterion_group!(benches, bench_voc_mux, bench_voc_demux, bench_voc_seek);
criterion_main!(benches);

//! vocal-probe - VOC 音频信息探测工具
//!
//! 对标 FFmpeg 的 ffprobe, 输出 VOC 文件的格式、流参数与数据包信息.
//! 输入为 `-` 时从标准输入读取 (不可 seek, 长度为 0 的数据块会报错).

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use std::process;

use vocal::logging::{self, LoggingConfig};
use vocal_codec::{CodecId, Packet};
use vocal_core::{Pts, VocalError};
use vocal_format::{Demuxer, FormatId, IoContext, Stream, VocDemuxOptions, VocDemuxer};

/// VOC 音频信息探测工具
#[derive(Parser, Debug)]
#[command(name = "vocal-probe", version, about = "纯 Rust VOC 音频信息探测工具")]
struct Cli {
    /// 输入文件路径, `-` 表示标准输入
    input: Option<String>,

    /// 列出每个数据包 (会读取全部数据)
    #[arg(long)]
    show_packets: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 静默模式 (只输出探测结果)
    #[arg(short, long)]
    quiet: bool,

    /// 单个数据包的字节上限, 0 表示默认 (2048)
    #[arg(long, default_value_t = 0)]
    max_packet_size: usize,

    /// 编码标签未知时使用的编解码器 (如 pcm_u8)
    #[arg(long, value_parser = parse_codec)]
    fallback_codec: Option<CodecId>,

    /// 把日志写入该目录 (默认输出到标准错误, 由 RUST_LOG 控制)
    #[arg(long)]
    log_dir: Option<String>,
}

fn parse_codec(name: &str) -> Result<CodecId, String> {
    CodecId::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = CodecId::ALL.iter().map(|id| id.name()).collect();
        format!("未知编解码器 '{name}', 可选: {}", known.join(", "))
    })
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    format: FormatInfo,
    streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packets: Option<Vec<PacketInfo>>,
}

/// 格式信息
#[derive(Serialize)]
struct FormatInfo {
    filename: String,
    format_name: String,
    nb_streams: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probe_score: Option<u32>,
    tags: Vec<(String, String)>,
}

/// 流信息
#[derive(Serialize)]
struct StreamInfo {
    index: usize,
    codec_type: String,
    codec_name: String,
    time_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    sample_rate: u32,
    channels: u32,
    channel_layout: String,
    sample_format: String,
    bits_per_coded_sample: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_rate: Option<u64>,
    tags: Vec<(String, String)>,
}

/// 数据包信息
#[derive(Serialize)]
struct PacketInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pts_time: Option<f64>,
    duration: i64,
    size: usize,
    pos: i64,
}

impl From<&Packet> for PacketInfo {
    fn from(pkt: &Packet) -> Self {
        Self {
            pts: pkt.pts.value(),
            pts_time: pkt.pts.to_seconds(pkt.time_base),
            duration: pkt.duration,
            size: pkt.size(),
            pos: pkt.pos,
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();

    let log_result = match &cli.log_dir {
        Some(dir) => logging::init(LoggingConfig::new(dir.clone())),
        None => {
            env_logger::init();
            Ok(())
        }
    };
    if let Err(e) = log_result {
        eprintln!("错误: 无法初始化日志: {e:#}");
        process::exit(1);
    }

    let Some(input) = cli.input.clone() else {
        print_banner();
        return;
    };

    if let Err(e) = run(&cli, &input) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli, input: &str) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "vocal-probe 版本 {} -- 纯 Rust VOC 探测工具",
            vocal::version()
        );
        eprintln!("输入文件: {input}");
    }

    let (mut io, format_id, probe_score) = if input == "-" {
        // 标准输入无法回退, 直接按 VOC 解析
        (IoContext::from_reader(std::io::stdin()), FormatId::Voc, None)
    } else {
        let mut io = IoContext::open_read(input)
            .with_context(|| format!("无法打开文件 '{input}'"))?;
        let registry = vocal::default_format_registry();
        let probe = registry
            .probe_input(&mut io, Some(input))
            .context("无法识别文件格式")?;
        (io, probe.format_id, Some(probe.score))
    };

    if !cli.quiet {
        match probe_score {
            Some(score) => eprintln!("格式: {format_id} (置信度: {score})"),
            None => eprintln!("格式: {format_id}"),
        }
    }

    let options = VocDemuxOptions {
        fallback_codec: cli.fallback_codec,
        max_packet_size: cli.max_packet_size,
    };
    let mut demuxer: Box<dyn Demuxer> = match format_id {
        FormatId::Voc => Box::new(VocDemuxer::with_options(options)),
        other => bail!("不支持的格式: {other}"),
    };
    demuxer.open(&mut io).context("无法解析文件头部")?;

    // VOC 的流参数在第一个数据包处确定, 至少读取一个数据包
    let mut packets = Vec::new();
    loop {
        match demuxer.read_packet(&mut io) {
            Ok(pkt) => {
                packets.push(PacketInfo::from(&pkt));
                if !cli.show_packets {
                    break;
                }
            }
            Err(VocalError::Eof) => break,
            Err(e) => {
                log::warn!("读取数据包时出错: {e}");
                if packets.is_empty() {
                    return Err(anyhow::Error::new(e).context("无法读取第一个数据包"));
                }
                break;
            }
        }
    }

    let output = ProbeOutput {
        format: FormatInfo {
            filename: input.to_string(),
            format_name: format_id.name().to_string(),
            nb_streams: demuxer.streams().len(),
            duration: demuxer.duration(),
            probe_score,
            tags: demuxer.metadata().to_vec(),
        },
        streams: demuxer.streams().iter().map(build_stream_info).collect(),
        packets: cli.show_packets.then_some(packets),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("序列化 JSON 失败")?;
        println!("{json}");
    } else {
        print_format_text(&output.format);
        print_streams_text(&output.streams);
        if let Some(packets) = &output.packets {
            print_packets_text(packets);
        }
    }
    Ok(())
}

/// 从 Stream 构建 StreamInfo
fn build_stream_info(stream: &Stream) -> StreamInfo {
    let duration = Pts::Known(stream.duration)
        .to_seconds(stream.time_base)
        .filter(|_| stream.duration >= 0);

    let mut info = StreamInfo {
        index: stream.index,
        codec_type: stream.media_type.to_string(),
        codec_name: stream.codec_id.to_string(),
        time_base: stream.time_base.to_string(),
        duration,
        sample_rate: 0,
        channels: 0,
        channel_layout: String::new(),
        sample_format: String::new(),
        bits_per_coded_sample: 0,
        bit_rate: None,
        tags: stream.metadata.clone(),
    };

    if let Some(audio) = stream.audio() {
        info.sample_rate = audio.sample_rate;
        info.channels = audio.channel_layout.channels;
        info.channel_layout = audio.channel_layout.to_string();
        info.sample_format = audio.sample_format.to_string();
        info.bits_per_coded_sample = audio.bits_per_coded_sample;
        info.bit_rate = (audio.bit_rate > 0).then_some(audio.bit_rate);
    }

    info
}

/// 文本输出: 格式信息
fn print_format_text(info: &FormatInfo) {
    println!("[FORMAT]");
    println!("  文件名       : {}", info.filename);
    println!("  格式名称     : {}", info.format_name);
    println!("  流数量       : {}", info.nb_streams);
    if let Some(dur) = info.duration {
        println!("  时长         : {dur:.3} 秒");
    }
    if let Some(score) = info.probe_score {
        println!("  探测置信度   : {score}");
    }
    for (key, value) in &info.tags {
        println!("  {key:<12} : {value}");
    }
    println!("[/FORMAT]");
    println!();
}

/// 文本输出: 流信息
fn print_streams_text(streams: &[StreamInfo]) {
    for stream in streams {
        println!("[STREAM #{}]", stream.index);
        println!("  类型         : {}", stream.codec_type);
        println!("  编解码器     : {}", stream.codec_name);
        println!("  时间基       : {}", stream.time_base);
        if let Some(dur) = stream.duration {
            println!("  时长         : {dur:.3} 秒");
        }
        println!("  采样率       : {} Hz", stream.sample_rate);
        println!("  声道数       : {}", stream.channels);
        println!("  声道布局     : {}", stream.channel_layout);
        println!("  采样格式     : {}", stream.sample_format);
        println!("  编码位深     : {}", stream.bits_per_coded_sample);
        if let Some(br) = stream.bit_rate {
            println!("  码率         : {} kbps", br / 1000);
        }
        for (key, value) in &stream.tags {
            println!("  {key:<12} : {value}");
        }
        println!("[/STREAM]");
        println!();
    }
}

/// 文本输出: 数据包列表
fn print_packets_text(packets: &[PacketInfo]) {
    println!("[PACKETS]");
    for pkt in packets {
        let pts = pkt
            .pts
            .map_or_else(|| "NOPTS".to_string(), |v| v.to_string());
        println!(
            "  pts={:<10} duration={:<6} size={:<6} pos={}",
            pts, pkt.duration, pkt.size, pkt.pos
        );
    }
    let total_bytes: usize = packets.iter().map(|p| p.size).sum();
    println!("  数据包总数   : {}", packets.len());
    println!(
        "  数据总量     : {} 字节 ({:.2} KB)",
        total_bytes,
        total_bytes as f64 / 1024.0
    );
    println!("[/PACKETS]");
    println!();
}

/// 打印版本横幅
fn print_banner() {
    println!(
        "vocal-probe 版本 {} -- 纯 Rust VOC 探测工具",
        vocal::version()
    );
    println!();
    println!("用法: vocal-probe [选项] <输入文件|->");
    println!();
    println!("选项:");
    println!("  --show-packets          列出每个数据包");
    println!("  --json                  以 JSON 格式输出");
    println!("  --max-packet-size <N>   单个数据包的字节上限");
    println!("  --fallback-codec <名称> 编码标签未知时使用的编解码器");
    println!("  --log-dir <目录>        把日志写入文件");
    println!("  -q, --quiet             静默模式");
    println!();
    println!("使用 --help 查看完整用法.");
}

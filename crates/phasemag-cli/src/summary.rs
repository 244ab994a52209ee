use console::Style;
use phasemag_core::pipeline::{MagnifyReport, PipelineConfig};
use phasemag_core::temporal::FilterStrategy;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();
    let mag = &config.magnification;

    println!();
    println!("  {}", s.title.apply_to("Phase Magnification"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Factor"),
        s.value.apply_to(format!("{}x", mag.factor))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Max frames"),
        s.value.apply_to(mag.max_frames)
    );
    println!();

    println!("  {}", s.header.apply_to("Pyramid"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Scales"),
        s.value.apply_to(mag.pyramid.scales)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Orient."),
        s.value.apply_to(mag.pyramid.orientations)
    );
    println!();

    let temporal = &mag.temporal;
    println!("  {}", s.header.apply_to("Temporal Filter"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(&temporal.strategy)
    );
    if let FilterStrategy::Butterworth {
        settling_frames, ..
    } = temporal.strategy
    {
        if settling_frames > 0 {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Settling"),
                s.value.apply_to(format!("{settling_frames} frames"))
            );
        }
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!("{} frames", temporal.window_size))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Band"),
        s.value
            .apply_to(format!("{:.2}-{:.2} Hz", temporal.low_freq, temporal.high_freq))
    );
    match temporal.sampling_rate {
        Some(rate) => println!(
            "    {:<12}{}",
            s.label.apply_to("Rate"),
            s.value.apply_to(format!("{rate:.2} Hz"))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Rate"),
            s.disabled.apply_to("from source")
        ),
    }
    println!();
}

pub fn print_report(report: &MagnifyReport, config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Result"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Read"),
        s.value.apply_to(report.frames_read)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Written"),
        s.value.apply_to(report.frames_written)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Filter"),
        s.method.apply_to(format!(
            "{} @ {:.2} Hz",
            report.filter, report.sampling_rate
        ))
    );
    match report.first_output_iteration {
        Some(iteration) => println!(
            "    {:<12}{}",
            s.label.apply_to("Latency"),
            s.value.apply_to(format!("{iteration} iterations"))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Latency"),
            s.disabled.apply_to("no output")
        ),
    }
    if report.read_stopped_early {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Input"),
            s.disabled.apply_to("stopped early")
        );
    }
    println!();
    println!(
        "  Output saved to {}",
        s.path.apply_to(config.output.display())
    );
}

//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `p` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Batches: {}", p.get_batches())?;
    writeln!(w, "{S4}Samples: {}", p.get_samples())?;
    writeln!(
        w,
        "{S4}Foreground samples: {} ({})",
        p.get_foreground(),
        f64_to_display(p.get_foreground_ratio())
    )?;
    writeln!(w, "{S4}Waiting time: {} us", p.get_batch_time_us())?;
    writeln!(
        w,
        "{S4}Average per sample: {} us",
        f64_to_display(p.get_avg_sample_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    match p.get_most_time_consuming() {
        Some((index, d)) => write!(w, "{S4}Slowest batch #{index} costs {} us", d.as_micros()),
        None => write!(w, "{S4}Slowest batch: /"),
    }
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf).unwrap();
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            utils::sep();
        }

        // 三种策略在同一 epoch 下产出相同批次, 样本统计应当一致.
        let mut counts = self.data.iter().map(|(_, p)| (p.get_samples(), p.get_foreground()));
        if let Some(first) = counts.next() {
            if counts.any(|c| c != first) {
                log::error!("strategies disagree on batch contents");
            }
        }
    }
}

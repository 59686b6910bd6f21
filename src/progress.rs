use std::io;
use std::io::Write;
use std::time;

use isatty;


pub trait ProgressSink {
	fn update(&mut self, inow: usize);
	fn finish(&mut self, inow: Option<usize>);
}


/// Writes a self-overwriting status line to stdout.
pub struct ProgressMeter {
	label: String,
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
	n: Option<usize>,
}

impl ProgressMeter {
	pub fn start<S: Into<String>>(label: S, n: Option<usize>) -> Self {
		let now = time::Instant::now();
		let label = label.into();
		match n {
			Some(_) => print!("{} {:6.0}% [{:8.2}/s]\r", label, 0.0, 0.0),
			None => print!("{} {:12} [{:8.2}/s]\r", label, 0, 0.0),
		}
		let _ = io::stdout().flush();
		Self{
			label,
			t0: now,
			tprev: now,
			iprev: 0,
			n,
		}
	}
}

impl ProgressSink for ProgressMeter {
	fn update(&mut self, inow: usize) {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64();
		let rate = (inow.saturating_sub(self.iprev)) as f64 / dt;
		match self.n {
			Some(n) => {
				let done = (inow as f64) / (n as f64);
				print!("{} {:6.0}% [{:8.2}/s]\r", self.label, done * 100.0, rate);
			},
			None => {
				print!("{} {:12} [{:8.2}/s]\r", self.label, inow, rate);
			},
		}
		let _ = io::stdout().flush();
		self.iprev = inow;
		self.tprev = now;
	}

	fn finish(&mut self, inow: Option<usize>) {
		let (inow, tnow) = match inow.or(self.n) {
			Some(inow) => (inow, time::Instant::now()),
			None => (self.iprev, self.tprev),
		};
		let dt = (tnow - self.t0).as_secs_f64();
		let rate = inow as f64 / dt;
		match self.n {
			Some(_) => println!("{} {:6.0}% [{:8.2}/s]", self.label, 100.0, rate),
			None => println!("{} {:12} [{:8.2}/s]", self.label, inow, rate),
		}
	}
}


/// Discards all progress.
pub struct Silent;

impl ProgressSink for Silent {
	fn update(&mut self, _inow: usize) {}
	fn finish(&mut self, _inow: Option<usize>) {}
}


/// Forwards only every `step`-th update to the wrapped sink.
pub struct StepMeter<'x, S: ProgressSink + ?Sized> {
	sink: &'x mut S,
	step: usize,
	last: usize,
}

impl<'x, S: ProgressSink + ?Sized> StepMeter<'x, S> {
	pub fn new(sink: &'x mut S, step: usize) -> Self {
		Self{
			sink,
			step: step.max(1),
			last: 0,
		}
	}
}

impl<'x, S: ProgressSink + ?Sized> ProgressSink for StepMeter<'x, S> {
	fn update(&mut self, inow: usize) {
		if inow >= self.last + self.step {
			self.sink.update(inow);
			self.last = inow;
		}
	}

	fn finish(&mut self, inow: Option<usize>) {
		self.sink.finish(inow);
	}
}


/// A terminal meter when stdout is a terminal, nothing otherwise.
pub fn default_output<S: Into<String>>(label: S, n: Option<usize>) -> Box<dyn ProgressSink> {
	if isatty::stdout_isatty() {
		Box::new(ProgressMeter::start(label, n))
	} else {
		Box::new(Silent)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Default)]
	struct Recorder {
		updates: Vec<usize>,
		finished: Option<Option<usize>>,
	}

	impl ProgressSink for Recorder {
		fn update(&mut self, inow: usize) {
			self.updates.push(inow);
		}

		fn finish(&mut self, inow: Option<usize>) {
			self.finished = Some(inow);
		}
	}

	#[test]
	fn step_meter_thins_updates() {
		let mut rec = Recorder::default();
		{
			let mut pm = StepMeter::new(&mut rec, 10);
			for i in 1..=35 {
				pm.update(i);
			}
			pm.finish(Some(35));
		}
		assert_eq!(rec.updates, vec![10, 20, 30]);
		assert_eq!(rec.finished, Some(Some(35)));
	}
}

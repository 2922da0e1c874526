// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;

fn main() {
    // main doesn't return a Result, because that would print the Debug form of
    // the error rather than the Display form.
    if let Err(e) = nro_fmlo::Fmlo::parse().run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

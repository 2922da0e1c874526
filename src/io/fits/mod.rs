// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading and writing FITS files.
//!
//! Errors carry the location of the caller (via `#[track_caller]`), which
//! makes cfitsio problems much easier to track down.

mod error;

pub use error::FitsError;

use std::{
    ffi::{CStr, CString},
    fmt::Display,
    os::raw::{c_char, c_int},
    panic::Location,
    path::Path,
    ptr,
};

use fitsio::{hdu::*, FitsFile};

/// The largest number of bytes cfitsio will put into a keyword name, value or
/// comment (plus a terminating null).
const FLEN_CARD: usize = 81;

/// Header keywords that describe the structure of an HDU rather than its
/// contents.
fn is_structural_key(key: &str) -> bool {
    const EXACT: [&str; 13] = [
        "SIMPLE", "BITPIX", "NAXIS", "EXTEND", "XTENSION", "PCOUNT", "GCOUNT", "TFIELDS",
        "EXTNAME", "CONTINUE", "COMMENT", "HISTORY", "LONGSTRN",
    ];
    const PREFIXES: [&str; 5] = ["NAXIS", "TTYPE", "TFORM", "TUNIT", "TDIM"];
    key.is_empty() || EXACT.contains(&key) || PREFIXES.iter().any(|p| {
        key.strip_prefix(p)
            .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false)
    })
}

fn fitsio_error(
    fits_fptr: &FitsFile,
    hdu_description: String,
    e: fitsio::errors::Error,
    caller: &'static Location<'static>,
) -> FitsError {
    FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_description: hdu_description.into_boxed_str(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    }
}

/// Turn a cfitsio status code into a located error.
#[track_caller]
fn check_status(fits_fptr: &FitsFile, hdu: &FitsHdu, status: c_int) -> Result<(), FitsError> {
    fitsio::errors::check_status(status)
        .map_err(|e| fitsio_error(fits_fptr, format!("{}", hdu.number + 1), e, Location::caller()))
}

/// Open a fits file.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::open(file.as_ref()).map_err(|e| {
        let caller = Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Create a new fits file (with an empty primary HDU). An existing file is
/// replaced.
#[track_caller]
pub(crate) fn fits_create<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::create(file.as_ref())
        .overwrite()
        .open()
        .map_err(|e| {
            let caller = Location::caller();
            FitsError::Open {
                fits_error: Box::new(e),
                fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            }
        })
}

/// Open a fits file's HDU. This also makes it the current HDU.
#[track_caller]
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    fits_fptr
        .hdu(hdu_description)
        .map_err(|e| fitsio_error(fits_fptr, format!("{hdu_description}"), e, Location::caller()))
}

/// The number of HDUs in the file.
#[track_caller]
pub(crate) fn fits_num_hdus(fits_fptr: &mut FitsFile) -> Result<usize, FitsError> {
    fits_fptr
        .num_hdus()
        .map_err(|e| fitsio_error(fits_fptr, "all".to_string(), e, Location::caller()))
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
#[track_caller]
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(fitsio::errors::Error::Fits(fe)) if matches!(fe.status, 202 | 204) => return Ok(None),
        Err(e) => {
            return Err(fitsio_error(
                fits_fptr,
                format!("{}", hdu.number + 1),
                e,
                Location::caller(),
            ))
        }
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => {
            let caller = Location::caller();
            Err(FitsError::Parse {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
#[track_caller]
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    match fits_get_optional_key(fits_fptr, hdu, keyword) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            let caller = Location::caller();
            Err(FitsError::MissingKey {
                key: keyword.to_string().into_boxed_str(),
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
        Err(error) => Err(error),
    }
}

/// Get a column from a fits file's HDU.
#[track_caller]
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<T>, FitsError> {
    hdu.read_col(fits_fptr, keyword).map_err(|e| {
        fitsio_error(
            fits_fptr,
            format!("{}", hdu.number + 1),
            e,
            Location::caller(),
        )
    })
}

/// Read `num_values` doubles from a column, starting with the first value of
/// the (0-indexed) `row`. Reads continue into following rows, so this can get
/// a whole vector cell or a whole column. `fitsio` only reads the first value
/// of each cell, so this goes through cfitsio directly.
#[track_caller]
pub(crate) fn fits_get_col_values(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
    row: usize,
    num_values: usize,
) -> Result<Vec<f64>, FitsError> {
    fits_open_hdu(fits_fptr, hdu.number)?;
    let column_ffi =
        CString::new(column).expect("fits_get_col_values: CString::new() failed for column");
    let mut values = vec![0.0; num_values];
    let mut status = 0;
    unsafe {
        let mut col_num = 0;
        // ffgcno = fits_get_colnum
        fitsio_sys::ffgcno(
            fits_fptr.as_raw(),
            0,
            column_ffi.as_ptr() as *mut c_char,
            &mut col_num,
            &mut status,
        );
        if status == 0 && !values.is_empty() {
            // ffgcvd = fits_read_col_dbl
            fitsio_sys::ffgcvd(
                fits_fptr.as_raw(),
                col_num,
                row as i64 + 1,
                1,
                values.len() as _,
                f64::NAN,
                values.as_mut_ptr(),
                &mut 0,
                &mut status,
            );
        }
    }
    check_status(fits_fptr, hdu, status)?;
    Ok(values)
}

/// Get a double-precision column whose cells hold `N` values each.
#[track_caller]
pub(crate) fn fits_get_vector_col<const N: usize>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
    num_rows: usize,
) -> Result<Vec<[f64; N]>, FitsError> {
    let flat = fits_get_col_values(fits_fptr, hdu, column, 0, num_rows * N)?;
    Ok(flat
        .chunks_exact(N)
        .map(|c| {
            let mut cell = [0.0; N];
            cell.copy_from_slice(c);
            cell
        })
        .collect())
}

/// Write a double-precision column whose cells hold `N` values each. The
/// column must have been created with a repeat count of `N`.
#[track_caller]
pub(crate) fn fits_write_vector_col<const N: usize>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    column: &str,
    data: &[[f64; N]],
) -> Result<(), FitsError> {
    if data.is_empty() {
        return Ok(());
    }
    fits_open_hdu(fits_fptr, hdu.number)?;
    let column_ffi = CString::new(column)
        .expect("fits_write_vector_col: CString::new() failed for column");
    let mut flat: Vec<f64> = data.iter().flatten().copied().collect();
    let mut status = 0;
    unsafe {
        let mut col_num = 0;
        // ffgcno = fits_get_colnum
        fitsio_sys::ffgcno(
            fits_fptr.as_raw(),
            0,
            column_ffi.as_ptr() as *mut c_char,
            &mut col_num,
            &mut status,
        );
        if status == 0 {
            // ffpcld = fits_write_col_dbl
            fitsio_sys::ffpcld(
                fits_fptr.as_raw(),
                col_num,
                1,
                1,
                flat.len() as _,
                flat.as_mut_ptr(),
                &mut status,
            );
        }
    }
    check_status(fits_fptr, hdu, status)
}

/// Given a FITS file pointer, and a keyword to a long string keyword that may
/// or may not exist, pull out the long string of the keyword. This deals with
/// FITSs CONTINUE mechanism by calling a low level fits function.
#[track_caller]
pub(crate) fn fits_get_optional_key_long_string(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<String>, FitsError> {
    fits_open_hdu(fits_fptr, hdu.number)?;
    let keyword_ffi = CString::new(keyword)
        .expect("fits_get_optional_key_long_string: CString::new() failed for keyword");
    let long_string = unsafe {
        let mut status = 0;
        let mut long_string_ptr = ptr::null_mut();
        // ffgkls = fits_read_key_longstr
        fitsio_sys::ffgkls(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            &mut long_string_ptr,
            ptr::null_mut(),
            &mut status,
        );
        match status {
            0 => {
                let long_string = CStr::from_ptr(long_string_ptr)
                    .to_string_lossy()
                    .into_owned();
                // fffree = fits_free_memory
                fitsio_sys::fffree(long_string_ptr.cast(), &mut 0);
                Some(long_string)
            }
            202 | 204 => None,
            _ => {
                let caller = Location::caller();
                return Err(FitsError::LongString {
                    key: keyword.to_string().into_boxed_str(),
                    fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                    hdu_num: hdu.number + 1,
                    source_file: caller.file(),
                    source_line: caller.line(),
                    source_column: caller.column(),
                });
            }
        }
    };

    Ok(long_string)
}

/// Write a (possibly long) string keyword with a comment. Strings longer than
/// a card use the CONTINUE convention.
#[track_caller]
pub(crate) fn fits_write_long_string(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    value: &str,
    comment: &str,
) -> Result<(), FitsError> {
    fits_open_hdu(fits_fptr, hdu.number)?;
    let keyword_ffi = CString::new(keyword)
        .expect("fits_write_long_string: CString::new() failed for keyword");
    let value_ffi =
        CString::new(value).expect("fits_write_long_string: CString::new() failed for value");
    let comment_ffi =
        CString::new(comment).expect("fits_write_long_string: CString::new() failed for comment");
    let mut status = 0;
    unsafe {
        // ffpkls = fits_write_key_longstr
        fitsio_sys::ffpkls(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            value_ffi.as_ptr(),
            comment_ffi.as_ptr(),
            &mut status,
        );
    }
    if status != 0 {
        let caller = Location::caller();
        return Err(FitsError::LongString {
            key: keyword.to_string().into_boxed_str(),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        });
    }
    Ok(())
}

/// Write an integer keyword with a comment.
#[track_caller]
pub(crate) fn fits_write_int(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    value: i64,
    comment: &str,
) -> Result<(), FitsError> {
    fits_open_hdu(fits_fptr, hdu.number)?;
    let keyword_ffi =
        CString::new(keyword).expect("fits_write_int: CString::new() failed for keyword");
    let comment_ffi =
        CString::new(comment).expect("fits_write_int: CString::new() failed for comment");
    let mut status = 0;
    unsafe {
        // ffpkyj = fits_write_key_lng
        fitsio_sys::ffpkyj(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            value,
            comment_ffi.as_ptr(),
            &mut status,
        );
    }
    check_status(fits_fptr, hdu, status)
}

/// Write a float keyword with a comment. Enough significant digits are written
/// that the value survives a round trip.
#[track_caller]
pub(crate) fn fits_write_float(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    value: f64,
    comment: &str,
) -> Result<(), FitsError> {
    fits_open_hdu(fits_fptr, hdu.number)?;
    let keyword_ffi =
        CString::new(keyword).expect("fits_write_float: CString::new() failed for keyword");
    let comment_ffi =
        CString::new(comment).expect("fits_write_float: CString::new() failed for comment");
    let mut status = 0;
    unsafe {
        // ffpkyd = fits_write_key_dbl; a negative "decimals" means %G with
        // that many significant digits.
        fitsio_sys::ffpkyd(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            value,
            -17,
            comment_ffi.as_ptr(),
            &mut status,
        );
    }
    check_status(fits_fptr, hdu, status)
}

/// A header card as cfitsio returns it; the value is unparsed (strings still
/// have their quotes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCard {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) comment: String,
}

/// Read every non-structural card in a HDU, in order.
#[track_caller]
pub(crate) fn fits_get_cards(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<Vec<RawCard>, FitsError> {
    fits_open_hdu(fits_fptr, hdu.number)?;
    let mut status = 0;
    let mut num_keys = 0;
    unsafe {
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(fits_fptr.as_raw(), &mut num_keys, &mut 0, &mut status);
    }
    check_status(fits_fptr, hdu, status)?;

    let mut cards = Vec::with_capacity(num_keys as usize);
    for i in 1..=num_keys {
        let mut key = [0 as c_char; FLEN_CARD];
        let mut value = [0 as c_char; FLEN_CARD];
        let mut comment = [0 as c_char; FLEN_CARD];
        let (key, value, comment) = unsafe {
            // ffgkyn = fits_read_keyn
            fitsio_sys::ffgkyn(
                fits_fptr.as_raw(),
                i,
                key.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            );
            (
                CStr::from_ptr(key.as_ptr()).to_string_lossy().into_owned(),
                CStr::from_ptr(value.as_ptr()).to_string_lossy().into_owned(),
                CStr::from_ptr(comment.as_ptr()).to_string_lossy().into_owned(),
            )
        };
        check_status(fits_fptr, hdu, status)?;
        if is_structural_key(&key) {
            continue;
        }
        cards.push(RawCard {
            key,
            value,
            comment,
        });
    }

    Ok(cards)
}

/// Get the columns and number of rows of a table HDU.
#[track_caller]
pub(crate) fn fits_get_table_info<'a>(
    fits_fptr: &FitsFile,
    hdu: &'a FitsHdu,
) -> Result<(&'a [fitsio::tables::ConcreteColumnDescription], usize), FitsError> {
    match &hdu.info {
        HduInfo::TableInfo {
            column_descriptions,
            num_rows,
        } => Ok((column_descriptions, *num_rows)),
        _ => {
            let caller = Location::caller();
            Err(FitsError::NotTable {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Read a whole image as doubles.
#[track_caller]
pub(crate) fn fits_get_image(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<Vec<f64>, FitsError> {
    hdu.read_image(fits_fptr).map_err(|e| {
        fitsio_error(
            fits_fptr,
            format!("{}", hdu.number + 1),
            e,
            Location::caller(),
        )
    })
}

/// Turn any fitsio error into a located error for the given HDU.
#[track_caller]
pub(crate) fn fits_error(
    fits_fptr: &FitsFile,
    hdu_description: impl Display,
    e: fitsio::errors::Error,
) -> FitsError {
    fitsio_error(
        fits_fptr,
        format!("{hdu_description}"),
        e,
        Location::caller(),
    )
}

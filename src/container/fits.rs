// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Persisting containers as FITS files.
//!
//! The `PRIMARY` extension becomes the primary HDU (header only); every other
//! extension becomes an image or binary-table HDU named by `EXTNAME`. Text
//! cards use the long-string convention, so obstable entries of any length
//! survive. Table column units are written as `TUNITn`.

use std::path::Path;

use fitsio::{
    hdu::{FitsHdu, HduInfo},
    images::{ImageDescription, ImageType},
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};
use log::{debug, trace};
use ndarray::prelude::*;

use super::*;
use crate::{constants::PRIMARY_EXTNAME, io::fits::*};

impl Container {
    /// Write the container to a FITS file, replacing any existing file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ContainerError> {
        let path = path.as_ref();
        debug!("Writing container to {}", path.display());
        let mut fptr = fits_create(path)?;

        let mut extensions = self.extensions.iter().peekable();
        let primary_hdu = fits_open_hdu(&mut fptr, 0usize)?;
        if let Some(primary) = extensions.next_if(|e| e.name == PRIMARY_EXTNAME) {
            if !matches!(primary.payload, Payload::Empty) {
                return Err(ContainerError::PrimaryPayload);
            }
            write_header(&mut fptr, &primary_hdu, &primary.header)?;
        }

        for ext in extensions {
            trace!("Writing extension {}", ext.name);
            let hdu = match &ext.payload {
                Payload::Empty => {
                    return Err(ContainerError::HeaderOnly {
                        name: ext.name.clone(),
                    })
                }
                Payload::Image(image) => write_image(&mut fptr, &ext.name, image)?,
                Payload::Table(table) => write_table(&mut fptr, &ext.name, table)?,
            };
            write_header(&mut fptr, &hdu, &ext.header)?;
        }

        Ok(())
    }

    /// Read a container from a FITS file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Container, ContainerError> {
        let path = path.as_ref();
        debug!("Reading container from {}", path.display());
        let mut fptr = fits_open(path)?;
        let num_hdus = fits_num_hdus(&mut fptr)?;

        let mut container = Container::default();
        for i in 0..num_hdus {
            let hdu = fits_open_hdu(&mut fptr, i)?;
            let name = if i == 0 {
                PRIMARY_EXTNAME.to_string()
            } else {
                fits_get_optional_key::<String>(&mut fptr, &hdu, "EXTNAME")?
                    .unwrap_or_else(|| format!("HDU{}", i + 1))
            };
            trace!("Reading HDU {} ({name})", i + 1);

            let payload = match &hdu.info {
                HduInfo::ImageInfo { shape, .. } => match shape.len() {
                    0 => Payload::Empty,
                    2 => {
                        let data = fits_get_image(&mut fptr, &hdu)?;
                        let image = Array2::from_shape_vec((shape[0], shape[1]), data)
                            .map_err(|_| ContainerError::ImageDimensions {
                                name: name.clone(),
                                ndim: shape.len(),
                            })?;
                        Payload::Image(image)
                    }
                    ndim => return Err(ContainerError::ImageDimensions { name, ndim }),
                },
                HduInfo::TableInfo { .. } => Payload::Table(read_table(&mut fptr, &hdu, &name)?),
                _ => return Err(ContainerError::NotTable { name }),
            };

            let mut header = Header::default();
            for card in fits_get_cards(&mut fptr, &hdu)? {
                let value = header_value(&mut fptr, &hdu, &card)?;
                header.insert(card.key, value, &card.comment);
            }

            container.push(Extension {
                name,
                header,
                payload,
            })?;
        }

        Ok(container)
    }
}

fn write_header(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    header: &Header,
) -> Result<(), ContainerError> {
    for (key, card) in header.iter() {
        match &card.value {
            HeaderValue::Text(s) => fits_write_long_string(fptr, hdu, key, s, &card.comment)?,
            HeaderValue::Int(v) => fits_write_int(fptr, hdu, key, *v, &card.comment)?,
            HeaderValue::Float(v) => fits_write_float(fptr, hdu, key, *v, &card.comment)?,
        }
    }
    Ok(())
}

fn write_image(
    fptr: &mut FitsFile,
    name: &str,
    image: &Array2<f64>,
) -> Result<FitsHdu, ContainerError> {
    let (num_rows, num_cols) = image.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[num_rows, num_cols],
    };
    let hdu = fptr
        .create_image(name, &description)
        .map_err(|e| fits_error(fptr, name, e))?;
    let data: Vec<f64> = image.iter().copied().collect();
    hdu.write_image(fptr, &data)
        .map_err(|e| fits_error(fptr, name, e))?;
    Ok(hdu)
}

fn write_table(
    fptr: &mut FitsFile,
    name: &str,
    table: &Table,
) -> Result<FitsHdu, ContainerError> {
    let num_rows = table.num_rows();
    let mut descriptions = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        if column.data.len() != num_rows {
            return Err(ContainerError::ColumnLength {
                extension: name.to_string(),
                column: column.name.clone(),
                expected: num_rows,
                got: column.data.len(),
            });
        }
        let mut base = ColumnDescription::new(&column.name);
        let description = match &column.data {
            ColumnData::Text { width, values } => {
                if let Some(value) = values.iter().find(|v| v.len() > *width) {
                    return Err(ContainerError::TextTooWide {
                        extension: name.to_string(),
                        column: column.name.clone(),
                        width: *width,
                        value: value.clone(),
                    });
                }
                base.with_type(ColumnDataType::String)
                    .that_repeats(*width)
            }
            ColumnData::Float(_) => base.with_type(ColumnDataType::Double),
            ColumnData::FloatPair(_) => base.with_type(ColumnDataType::Double).that_repeats(2),
        };
        descriptions.push(description.create().map_err(|e| fits_error(fptr, name, e))?);
    }

    let hdu = fptr
        .create_table(name, &descriptions)
        .map_err(|e| fits_error(fptr, name, e))?;

    for (i, column) in table.columns.iter().enumerate() {
        if let Some(unit) = &column.unit {
            fits_write_long_string(fptr, &hdu, &format!("TUNIT{}", i + 1), unit, "")?;
        }
        if num_rows == 0 {
            continue;
        }
        match &column.data {
            ColumnData::Text { values, .. } => {
                hdu.write_col(fptr, &column.name, values.as_slice())
                    .map_err(|e| fits_error(fptr, name, e))?;
            }
            ColumnData::Float(values) => {
                hdu.write_col(fptr, &column.name, values.as_slice())
                    .map_err(|e| fits_error(fptr, name, e))?;
            }
            ColumnData::FloatPair(values) => {
                fits_write_vector_col(fptr, &hdu, &column.name, values)?;
            }
        }
    }

    Ok(hdu)
}

fn read_table(fptr: &mut FitsFile, hdu: &FitsHdu, name: &str) -> Result<Table, ContainerError> {
    let (descriptions, num_rows) = fits_get_table_info(fptr, hdu)?;

    let mut columns = Vec::with_capacity(descriptions.len());
    for (i, description) in descriptions.iter().enumerate() {
        let column_name = description.name.as_str();
        let repeat = description.data_type.repeat;
        let data = match (&description.data_type.typ, repeat) {
            (ColumnDataType::String, width) => {
                let values: Vec<String> = if num_rows == 0 {
                    vec![]
                } else {
                    fits_get_col(fptr, hdu, column_name)?
                };
                ColumnData::Text {
                    width,
                    values: values.into_iter().map(|v| v.trim_end().to_string()).collect(),
                }
            }
            (_, 1) => ColumnData::Float(
                fits_get_vector_col::<1>(fptr, hdu, column_name, num_rows)?
                    .into_iter()
                    .map(|[v]| v)
                    .collect(),
            ),
            (_, 2) => {
                ColumnData::FloatPair(fits_get_vector_col::<2>(fptr, hdu, column_name, num_rows)?)
            }
            _ => {
                return Err(ContainerError::ColumnType {
                    extension: name.to_string(),
                    column: column_name.to_string(),
                    expected: "text, or one or two numbers per row",
                })
            }
        };
        let unit = fits_get_optional_key::<String>(fptr, hdu, &format!("TUNIT{}", i + 1))?
            .filter(|u| !u.is_empty());
        columns.push(Column {
            name: column_name.to_string(),
            unit,
            data,
        });
    }

    Ok(Table { columns })
}

/// Interpret a raw header card. Quoted values are read again with the
/// long-string convention so that continued values come back whole.
fn header_value(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    card: &RawCard,
) -> Result<HeaderValue, ContainerError> {
    let raw = card.value.trim();
    if raw.starts_with('\'') {
        let value = fits_get_optional_key_long_string(fptr, hdu, &card.key)?.unwrap_or_default();
        return Ok(HeaderValue::Text(value.trim_end().to_string()));
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(HeaderValue::Int(v));
    }
    // FITS allows a 'D' exponent.
    if let Ok(v) = raw.replace('D', "E").parse::<f64>() {
        return Ok(HeaderValue::Float(v));
    }
    // Logicals and anything else are kept verbatim.
    Ok(HeaderValue::Text(raw.to_string()))
}

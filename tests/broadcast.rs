use std::time::Duration;

use color_eyre::Result;
use common::{connect, receive_event, start_server};
use pretty_assertions::assert_eq;
use tokio::io::AsyncWriteExt;

mod common;

#[tokio::test]
async fn records_fan_out_to_all_subscribers() -> Result<()> {
    let (port, mut device) = start_server().await;

    let mut first = connect(port).await?;
    let mut second = connect(port).await?;

    device.write_all(b"12.5\r\n27.1\r\n").await?;

    for client in [&mut first, &mut second] {
        assert_eq!(receive_event(client).await?.data, "12.5");
        assert_eq!(receive_event(client).await?.data, "27.1");
    }

    Ok(())
}

#[tokio::test]
async fn chunk_boundaries_do_not_affect_records() -> Result<()> {
    let (port, mut device) = start_server().await;

    let mut client = connect(port).await?;

    // The second record split across two arrivals.
    device.write_all(b"12.5\r\n27.").await?;
    device.flush().await?;
    device.write_all(b"1\r\n").await?;

    assert_eq!(receive_event(&mut client).await?.data, "12.5");
    assert_eq!(receive_event(&mut client).await?.data, "27.1");

    Ok(())
}

#[tokio::test]
async fn no_replay_for_late_joiners() -> Result<()> {
    let (port, mut device) = start_server().await;

    // Published into the void: nobody is subscribed.
    device.write_all(b"early\r\n").await?;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut client = connect(port).await?;
    device.write_all(b"late\r\n").await?;

    // The first event the late joiner sees is the record published
    // after it joined.
    assert_eq!(receive_event(&mut client).await?.data, "late");

    Ok(())
}

#[tokio::test]
async fn unsubscribed_client_receives_no_further_records() -> Result<()> {
    let (port, mut device) = start_server().await;

    let mut first = connect(port).await?;
    let mut second = connect(port).await?;
    let mut third = connect(port).await?;

    device.write_all(b"A\r\n").await?;

    for client in [&mut first, &mut second, &mut third] {
        assert_eq!(receive_event(client).await?.data, "A");
    }

    third.close(None).await?;
    tokio::time::sleep(Duration::from_millis(250)).await;

    device.write_all(b"ON\r\n").await?;

    for client in [&mut first, &mut second] {
        assert_eq!(receive_event(client).await?.data, "ON");
    }

    Ok(())
}

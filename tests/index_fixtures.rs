mod common;

use std::io::Write;
use std::time::Duration;

use chrono::NaiveDate;
use common::{DAILY_INDEX, StubFetcher, daily_index_2020, read_fixture};
use edgar13f::{Crawler, EdgarError, EdgarUrls, IndexResponse, MasterIndexParser};
use flate2::{Compression, write::GzEncoder};

fn crawler(fetcher: StubFetcher) -> Crawler<StubFetcher> {
    Crawler::new(fetcher, EdgarUrls::default()).with_speed_bump(Duration::ZERO)
}

#[test]
fn parse_year_listing() {
    let listing: IndexResponse = serde_json::from_str(&read_fixture("daily-index/2020.json")).unwrap();

    assert_eq!(listing.directory.name, "daily-index/2020/");
    assert_eq!(listing.directory.parent_dir.as_deref(), Some("../"));
    assert_eq!(listing.directory.item.len(), 4);

    let qtr4 = &listing.directory.item[3];
    assert_eq!(qtr4.name, "QTR4");
    assert_eq!(qtr4.type_.as_deref(), Some("dir"));
    assert_eq!(
        qtr4.last_modified.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
        "2020-12-31 22:04:19"
    );
}

#[tokio::test]
async fn discovers_one_master_file_per_quarter() {
    let crawler = crawler(daily_index_2020());
    let links = crawler.master_index_links(2020, Some(0)).await.unwrap();

    assert_eq!(
        links,
        vec![
            format!("{}/2020/QTR1/master.20200102.idx", DAILY_INDEX),
            format!("{}/2020/QTR2/master.20200401.idx", DAILY_INDEX),
            format!("{}/2020/QTR3/master.20200701.idx", DAILY_INDEX),
            format!("{}/2020/QTR4/master.20201001.idx", DAILY_INDEX),
        ]
    );
}

#[tokio::test]
async fn walks_years_oldest_first() {
    let mut fetcher = daily_index_2020();
    fetcher.insert(
        format!("{}/2019/index.json", DAILY_INDEX),
        read_fixture("daily-index/2020.json"),
    );
    for quarter in 1..=4 {
        fetcher.insert(
            format!("{}/2019/QTR{}/index.json", DAILY_INDEX, quarter),
            read_fixture(format!("daily-index/2020-QTR{}.json", quarter)),
        );
    }

    let crawler = crawler(fetcher);
    let links = crawler.master_index_links(2020, Some(1)).await.unwrap();

    assert_eq!(links.len(), 4 * 2);
    assert!(links[0].contains("/2019/QTR1/"));
    assert!(links[7].contains("/2020/QTR4/"));
    assert_eq!(
        crawler.fetcher().requests()[0],
        format!("{}/2019/index.json", DAILY_INDEX)
    );
}

#[tokio::test]
async fn rejects_years_before_archive() {
    let crawler = crawler(StubFetcher::new());

    let result = crawler.master_index_links(1995, Some(3)).await;
    assert!(matches!(result, Err(EdgarError::InvalidArgument(_))));
    assert!(crawler.fetcher().requests().is_empty());
}

#[tokio::test]
async fn missing_year_listing_is_not_found() {
    let crawler = crawler(StubFetcher::new());
    let result = crawler.master_index_links(2021, None).await;
    assert!(matches!(result, Err(EdgarError::NotFound(_))));
}

#[test]
fn parse_master_index_fixture() {
    let parser = MasterIndexParser::new("https://www.sec.gov/Archives");
    let rows = parser
        .parse(&read_fixture("daily-index/master.20200102.idx"))
        .unwrap();

    assert_eq!(rows.len(), 4);
    let kingdon = &rows[1];
    assert_eq!(kingdon.cik, 1000097);
    assert_eq!(kingdon.form_type, "13F-HR");
    assert_eq!(kingdon.date_filed, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
    assert_eq!(
        kingdon.link,
        "https://www.sec.gov/Archives/edgar/data/1000097/000100009720000001/index.json"
    );

    let empty = parser.parse(&read_fixture("daily-index/master.empty.idx")).unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn parse_links_concatenates_in_order() {
    let crawler = crawler(daily_index_2020());
    let links = crawler.master_index_links(2020, None).await.unwrap();
    let rows = crawler.parse_links(&links).await.unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].company_name, "NICHOLAS FINANCIAL INC");
    assert_eq!(rows[3].form_type, "4");
}

#[tokio::test]
async fn parse_links_decompresses_gz() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(read_fixture("daily-index/master.20200102.idx").as_bytes())
        .unwrap();
    let link = format!("{}/2020/QTR1/master.20200102.idx.gz", DAILY_INDEX);
    let fetcher = StubFetcher::new().with(link.clone(), encoder.finish().unwrap());

    let rows = crawler(fetcher).parse_links(&[link]).await.unwrap();
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn parse_links_reports_failing_link() {
    let link = format!("{}/2020/QTR1/master.20200103.idx", DAILY_INDEX);
    let fetcher = StubFetcher::new().with(link.clone(), "<html>maintenance</html>");

    match crawler(fetcher).parse_links(&[link.clone()]).await {
        Err(EdgarError::Parse(msg)) => assert!(msg.contains(&link)),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn every_listing_fetch_is_followed_by_the_speed_bump() {
    let bump = Duration::from_millis(20);
    let crawler = Crawler::new(daily_index_2020(), EdgarUrls::default()).with_speed_bump(bump);
    crawler.master_index_links(2020, Some(0)).await.unwrap();

    let requests = crawler.fetcher().timed_requests();
    assert_eq!(requests[0].0, format!("{}/2020/index.json", DAILY_INDEX));
    assert_eq!(requests.len(), 5);
    for pair in requests.windows(2) {
        assert!(
            pair[1].1.duration_since(pair[0].1) >= bump,
            "{} fetched too soon after {}",
            pair[1].0,
            pair[0].0
        );
    }
}
